//! Database and transaction layer.
//!
//! Concurrency model:
//!
//! - [`ReadTransaction`] holds a shared lock on the table set for its whole
//!   lifetime, so every read within one transaction observes the same
//!   committed snapshot.
//! - [`WriteTransaction`] holds the upgradable lock, which admits concurrent
//!   readers but serializes writers. Mutations buffer into a pending overlay;
//!   reads through the transaction see the overlay merged over the committed
//!   state (read-your-writes).
//! - [`WriteTransaction::commit`] upgrades to the exclusive lock, applies the
//!   overlay, and persists through the backend. If persistence fails the
//!   in-memory application is rolled back, so a commit is all-or-nothing.
//!   Dropping a write transaction without committing discards the overlay.

use std::collections::{btree_map, BTreeMap};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockUpgradableReadGuard};

use crate::backend::{FileBackend, InMemoryBackend, StorageBackend};
use crate::tables::{Table, TableId, TableSet};
use crate::Result;

/// An embedded database over a fixed set of ordered tables.
pub struct Database<B: StorageBackend> {
    tables: RwLock<TableSet>,
    backend: Mutex<B>,
}

impl Database<FileBackend> {
    /// Opens the snapshot file at `path`, creating an empty database if the
    /// file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be read or fails its
    /// integrity checks.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_backend(FileBackend::new(path))
    }
}

impl Database<InMemoryBackend> {
    /// Creates an empty in-memory database.
    ///
    /// # Errors
    ///
    /// Infallible for the in-memory backend; `Result` keeps the signature
    /// uniform across backends.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_backend(InMemoryBackend)
    }
}

impl<B: StorageBackend> Database<B> {
    /// Creates a database over an arbitrary backend, loading its last
    /// persisted state when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend's stored state cannot be loaded.
    pub fn with_backend(mut backend: B) -> Result<Self> {
        let tables = backend.load()?.unwrap_or_default();
        Ok(Self { tables: RwLock::new(tables), backend: Mutex::new(backend) })
    }

    /// Begins a read transaction over the current committed snapshot.
    ///
    /// # Errors
    ///
    /// Infallible today; `Result` keeps the transaction API uniform.
    pub fn read(&self) -> Result<ReadTransaction<'_>> {
        Ok(ReadTransaction { tables: self.tables.read() })
    }

    /// Begins a write transaction. Blocks while another write transaction is
    /// active; concurrent readers proceed until commit.
    ///
    /// # Errors
    ///
    /// Infallible today; `Result` keeps the transaction API uniform.
    pub fn write(&self) -> Result<WriteTransaction<'_, B>> {
        Ok(WriteTransaction {
            guard: self.tables.upgradable_read(),
            backend: &self.backend,
            pending: (0..TableId::COUNT).map(|_| BTreeMap::new()).collect(),
        })
    }

    /// Total entries across all tables in the committed state.
    pub fn total_entries(&self) -> usize {
        self.tables.read().total_entries()
    }
}

/// A shared handle to a database.
pub type SharedDatabase<B> = Arc<Database<B>>;

fn bounds<'k>(
    start: Option<&'k [u8]>,
    end: Option<&'k [u8]>,
) -> (Bound<&'k [u8]>, Bound<&'k [u8]>) {
    let lower = start.map_or(Bound::Unbounded, Bound::Included);
    let upper = end.map_or(Bound::Unbounded, Bound::Excluded);
    (lower, upper)
}

// ============================================================================
// Read transactions
// ============================================================================

/// A snapshot-consistent read transaction.
pub struct ReadTransaction<'db> {
    tables: RwLockReadGuard<'db, TableSet>,
}

impl ReadTransaction<'_> {
    /// Point lookup.
    ///
    /// # Errors
    ///
    /// Infallible today; `Result` keeps the access API uniform.
    pub fn get<T: Table>(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tables.table(T::ID).get(key).cloned())
    }

    /// Existence check without copying the value.
    ///
    /// # Errors
    ///
    /// Infallible today.
    pub fn contains<T: Table>(&self, key: &[u8]) -> Result<bool> {
        Ok(self.tables.table(T::ID).contains_key(key))
    }

    /// Iterates the whole table in ascending key order. The iterator is
    /// double-ended; use `.rev()` for descending scans.
    ///
    /// # Errors
    ///
    /// Infallible today.
    pub fn iter<T: Table>(&self) -> Result<TableIterator<'_>> {
        self.range::<T>(None, None)
    }

    /// Iterates keys in `[start, end)` in ascending order. `None` bounds are
    /// unbounded. The iterator is double-ended.
    ///
    /// # Errors
    ///
    /// Infallible today.
    pub fn range<T: Table>(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<TableIterator<'_>> {
        Ok(TableIterator { inner: self.tables.table(T::ID).range::<[u8], _>(bounds(start, end)) })
    }
}

/// Ordered iterator over one table's committed entries, yielding owned
/// key/value pairs.
pub struct TableIterator<'t> {
    inner: btree_map::Range<'t, Vec<u8>, Vec<u8>>,
}

impl Iterator for TableIterator<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.clone(), v.clone()))
    }
}

impl DoubleEndedIterator for TableIterator<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k.clone(), v.clone()))
    }
}

// ============================================================================
// Write transactions
// ============================================================================

/// A buffered write transaction.
///
/// Only one write transaction exists at a time. Reads through the transaction
/// observe pending mutations (read-your-writes); other transactions never see
/// them until commit.
pub struct WriteTransaction<'db, B: StorageBackend> {
    guard: RwLockUpgradableReadGuard<'db, TableSet>,
    backend: &'db Mutex<B>,
    /// Per-table overlay: `Some(value)` = pending insert, `None` = pending
    /// delete (tombstone).
    pending: Vec<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl<B: StorageBackend> WriteTransaction<'_, B> {
    /// Buffers an insert (or overwrite).
    ///
    /// # Errors
    ///
    /// Infallible today; `Result` keeps the mutation API uniform.
    pub fn insert<T: Table>(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.pending[T::ID as usize].insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    /// Buffers a delete. Returns whether the key was visible to this
    /// transaction at the time of the call.
    ///
    /// # Errors
    ///
    /// Infallible today.
    pub fn delete<T: Table>(&mut self, key: &[u8]) -> Result<bool> {
        let existed = self.get::<T>(key)?.is_some();
        self.pending[T::ID as usize].insert(key.to_vec(), None);
        Ok(existed)
    }

    /// Point lookup through the pending overlay.
    ///
    /// # Errors
    ///
    /// Infallible today.
    pub fn get<T: Table>(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.pending[T::ID as usize].get(key) {
            Some(Some(value)) => Ok(Some(value.clone())),
            Some(None) => Ok(None),
            None => Ok(self.guard.table(T::ID).get(key).cloned()),
        }
    }

    /// Iterates keys in `[start, end)` ascending, with the pending overlay
    /// merged over the committed state.
    ///
    /// # Errors
    ///
    /// Infallible today.
    pub fn range<T: Table>(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<MergedRange<'_>> {
        Ok(self.merged_range::<T>(start, end, false))
    }

    /// Iterates keys in `[start, end)` descending, with the pending overlay
    /// merged over the committed state.
    ///
    /// # Errors
    ///
    /// Infallible today.
    pub fn range_rev<T: Table>(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<MergedRange<'_>> {
        Ok(self.merged_range::<T>(start, end, true))
    }

    fn merged_range<T: Table>(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        descending: bool,
    ) -> MergedRange<'_> {
        let mut overlay: Vec<(Vec<u8>, Option<Vec<u8>>)> = self.pending[T::ID as usize]
            .range::<[u8], _>(bounds(start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if descending {
            overlay.reverse();
        }
        MergedRange {
            base: self.guard.table(T::ID).range::<[u8], _>(bounds(start, end)),
            overlay: overlay.into_iter(),
            base_next: None,
            overlay_next: None,
            descending,
        }
    }

    /// Applies the pending overlay and persists the result.
    ///
    /// Holds the exclusive table lock across both steps, so other
    /// transactions observe either none or all of this transaction's
    /// mutations. On persistence failure the in-memory application is rolled
    /// back and the error returned.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if persistence fails.
    pub fn commit(self) -> Result<()> {
        let Self { guard, backend, pending } = self;
        let mut tables = RwLockUpgradableReadGuard::upgrade(guard);

        let mut mutations = 0usize;
        let mut undo: Vec<(TableId, Vec<u8>, Option<Vec<u8>>)> = Vec::new();
        for (id, table_pending) in TableId::ALL.iter().zip(pending) {
            let map = tables.table_mut(*id);
            for (key, op) in table_pending {
                let prior = match op {
                    Some(value) => map.insert(key.clone(), value),
                    None => map.remove(&key),
                };
                undo.push((*id, key, prior));
                mutations += 1;
            }
        }

        let result = backend.lock().persist(&tables);
        if let Err(error) = result {
            // Unwind in reverse application order
            for (id, key, prior) in undo.into_iter().rev() {
                let map = tables.table_mut(id);
                match prior {
                    Some(value) => {
                        map.insert(key, value);
                    },
                    None => {
                        map.remove(&key);
                    },
                }
            }
            tracing::warn!("commit rolled back after persistence failure");
            return Err(error);
        }

        tracing::debug!(mutations, "committed write transaction");
        Ok(())
    }

    /// Discards the pending overlay. Equivalent to dropping the transaction.
    pub fn abort(self) {}
}

/// Ascending or descending iterator over committed entries with a write
/// transaction's pending overlay applied (inserts win, tombstones hide).
pub struct MergedRange<'t> {
    base: btree_map::Range<'t, Vec<u8>, Vec<u8>>,
    overlay: std::vec::IntoIter<(Vec<u8>, Option<Vec<u8>>)>,
    base_next: Option<(&'t Vec<u8>, &'t Vec<u8>)>,
    overlay_next: Option<(Vec<u8>, Option<Vec<u8>>)>,
    descending: bool,
}

impl MergedRange<'_> {
    /// Whether `a` comes before `b` in iteration order.
    fn comes_first(&self, a: &[u8], b: &[u8]) -> bool {
        if self.descending {
            a > b
        } else {
            a < b
        }
    }
}

impl Iterator for MergedRange<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.base_next.is_none() {
                self.base_next =
                    if self.descending { self.base.next_back() } else { self.base.next() };
            }
            if self.overlay_next.is_none() {
                self.overlay_next = self.overlay.next();
            }

            match (self.base_next.take(), self.overlay_next.take()) {
                (None, None) => return None,
                (Some((key, value)), None) => return Some((key.clone(), value.clone())),
                (None, Some((key, op))) => match op {
                    Some(value) => return Some((key, value)),
                    None => continue, // tombstone for an already-absent key
                },
                (Some(base), Some((overlay_key, op))) => {
                    if *base.0 == overlay_key {
                        // Overlay wins; both sides consumed
                        match op {
                            Some(value) => return Some((overlay_key, value)),
                            None => continue, // tombstone hides the committed entry
                        }
                    } else if self.comes_first(base.0, &overlay_key) {
                        self.overlay_next = Some((overlay_key, op));
                        return Some((base.0.clone(), base.1.clone()));
                    } else {
                        self.base_next = Some(base);
                        match op {
                            Some(value) => return Some((overlay_key, value)),
                            None => continue,
                        }
                    }
                },
            }
        }
    }
}
