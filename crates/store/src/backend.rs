//! Storage backends: durable file snapshots or volatile memory.
//!
//! The file format is a single checksummed snapshot:
//!
//! ```text
//! ┌───────────────┬───────────────┬────────────────┬──────────────────┐
//! │ magic (8)     │ version (2LE) │ checksum (8LE) │ postcard body    │
//! └───────────────┴───────────────┴────────────────┴──────────────────┘
//! ```
//!
//! Commits write the whole table set to a sibling temp file, fsync it, then
//! atomically rename over the live file. A crash mid-commit leaves the
//! previous snapshot intact; a torn header or body is caught by the magic,
//! version, and seahash checks on the next open.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::error::{CodecSnafu, IoSnafu};
use crate::tables::TableSet;
use crate::{Error, Result, VERSION};

/// Magic bytes identifying a papertrail snapshot file.
pub const MAGIC: [u8; 8] = *b"PTRAILDB";

/// Snapshot header length: magic + version + checksum.
const HEADER_LEN: usize = 8 + 2 + 8;

/// A place table sets are loaded from and persisted to.
pub trait StorageBackend {
    /// Loads the last persisted table set, or `None` when nothing has been
    /// persisted yet.
    fn load(&mut self) -> Result<Option<TableSet>>;

    /// Durably persists the table set. Called while the committing write
    /// transaction still holds the table lock, so `tables` is a consistent
    /// snapshot.
    fn persist(&mut self, tables: &TableSet) -> Result<()>;
}

/// Volatile backend for tests and ephemeral stores. Persistence is a no-op.
#[derive(Debug, Default)]
pub struct InMemoryBackend;

impl StorageBackend for InMemoryBackend {
    fn load(&mut self) -> Result<Option<TableSet>> {
        Ok(None)
    }

    fn persist(&mut self, _tables: &TableSet) -> Result<()> {
        Ok(())
    }
}

/// Durable backend writing checksummed snapshot files with atomic rename.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl FileBackend {
    /// Creates a backend for the snapshot file at `path`. The file need not
    /// exist yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        Self { path, tmp_path: PathBuf::from(tmp) }
    }

    /// The snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_snapshot(data: &[u8]) -> Result<TableSet> {
        if data.len() < HEADER_LEN {
            return Err(Error::Corrupted {
                reason: format!("snapshot is {} bytes, header needs {HEADER_LEN}", data.len()),
            });
        }
        if data[..8] != MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = u16::from_le_bytes([data[8], data[9]]);
        if version != VERSION {
            return Err(Error::UnsupportedVersion { version });
        }
        let expected = u64::from_le_bytes(
            data[10..18].try_into().map_err(|_| Error::Corrupted {
                reason: "truncated checksum field".to_string(),
            })?,
        );
        let body = &data[HEADER_LEN..];
        let actual = seahash::hash(body);
        if actual != expected {
            return Err(Error::ChecksumMismatch { expected, actual });
        }
        let tables: TableSet = postcard::from_bytes(body).context(CodecSnafu)?;
        tables.check_shape()?;
        Ok(tables)
    }

    fn encode_snapshot(tables: &TableSet) -> Result<Vec<u8>> {
        let body = postcard::to_allocvec(tables).context(CodecSnafu)?;
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&seahash::hash(&body).to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn sync_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                File::open(parent).context(IoSnafu)?.sync_all().context(IoSnafu)?;
            }
        }
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn load(&mut self) -> Result<Option<TableSet>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut data = Vec::new();
        File::open(&self.path).context(IoSnafu)?.read_to_end(&mut data).context(IoSnafu)?;
        Self::decode_snapshot(&data).map(Some)
    }

    fn persist(&mut self, tables: &TableSet) -> Result<()> {
        let encoded = Self::encode_snapshot(tables)?;

        let mut tmp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.tmp_path)
            .context(IoSnafu)?;
        tmp.write_all(&encoded).context(IoSnafu)?;
        tmp.sync_all().context(IoSnafu)?;
        drop(tmp);

        fs::rename(&self.tmp_path, &self.path).context(IoSnafu)?;
        self.sync_parent_dir()?;

        tracing::debug!(
            path = %self.path.display(),
            bytes = encoded.len(),
            entries = tables.total_entries(),
            "persisted snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TableId;

    fn sample_tables() -> TableSet {
        let mut set = TableSet::new();
        set.table_mut(TableId::Events).insert(b"a".to_vec(), b"1".to_vec());
        set.table_mut(TableId::TimeIndex).insert(b"b".to_vec(), Vec::new());
        set
    }

    #[test]
    fn in_memory_load_is_empty() {
        let mut backend = InMemoryBackend;
        assert!(backend.load().expect("load").is_none());
        backend.persist(&sample_tables()).expect("persist is a no-op");
    }

    #[test]
    fn file_backend_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = FileBackend::new(dir.path().join("events.db"));

        assert!(backend.load().expect("load missing").is_none());

        backend.persist(&sample_tables()).expect("persist");
        let loaded = backend.load().expect("load").expect("snapshot exists");
        assert_eq!(loaded.table(TableId::Events).get(&b"a".to_vec()), Some(&b"1".to_vec()));
        assert_eq!(loaded.total_entries(), 2);
    }

    #[test]
    fn persist_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = FileBackend::new(dir.path().join("events.db"));

        backend.persist(&sample_tables()).expect("persist v1");

        let mut updated = sample_tables();
        updated.table_mut(TableId::Events).insert(b"c".to_vec(), b"2".to_vec());
        backend.persist(&updated).expect("persist v2");

        let loaded = backend.load().expect("load").expect("snapshot");
        assert_eq!(loaded.total_entries(), 3);
    }

    #[test]
    fn corrupted_body_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.db");
        let mut backend = FileBackend::new(&path);
        backend.persist(&sample_tables()).expect("persist");

        // Flip one byte in the body
        let mut data = fs::read(&path).expect("read");
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        fs::write(&path, &data).expect("write");

        match backend.load() {
            Err(Error::ChecksumMismatch { .. }) => {},
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn wrong_magic_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.db");
        fs::write(&path, b"NOTADB!!rest-of-file-padding").expect("write");

        let mut backend = FileBackend::new(&path);
        match backend.load() {
            Err(Error::InvalidMagic) => {},
            other => panic!("expected invalid magic, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_version_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.db");
        let mut backend = FileBackend::new(&path);
        backend.persist(&TableSet::new()).expect("persist");

        let mut data = fs::read(&path).expect("read");
        data[8] = 0xFF;
        data[9] = 0xFF;
        fs::write(&path, &data).expect("write");

        match backend.load() {
            Err(Error::UnsupportedVersion { version: 0xFFFF }) => {},
            other => panic!("expected unsupported version, got {other:?}"),
        }
    }

    #[test]
    fn truncated_file_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.db");
        fs::write(&path, &MAGIC[..4]).expect("write");

        let mut backend = FileBackend::new(&path);
        match backend.load() {
            Err(Error::Corrupted { .. }) => {},
            other => panic!("expected corrupted, got {other:?}"),
        }
    }
}
