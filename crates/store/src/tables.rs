//! Fixed table definitions for the store engine.
//!
//! The store has exactly 7 tables, all known at compile time. This enables
//! type-safe access and eliminates dynamic table lookup overhead. Table key
//! layouts are owned by the engine crate; the store treats keys and values as
//! opaque byte strings ordered lexicographically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Compile-time table identifier. All tables are statically defined; dynamic
/// creation is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TableId {
    /// Primary event storage: event id (16 bytes) -> serialized event.
    Events = 0,

    /// Global time index: {occurred_at_ms:8BE}{event_id:16} -> empty.
    TimeIndex = 1,

    /// Tenant-scoped time index:
    /// {org_hash:8BE}{occurred_at_ms:8BE}{event_id:16} -> empty.
    OrgTimeIndex = 2,

    /// Action-scoped time index:
    /// {action_hash:8BE}{occurred_at_ms:8BE}{event_id:16} -> empty.
    ActionTimeIndex = 3,

    /// Actor-scoped time index:
    /// {actor_hash:8BE}{occurred_at_ms:8BE}{event_id:16} -> empty.
    ActorTimeIndex = 4,

    /// Unique deduplication index: idempotency key bytes -> event id.
    IdempotencyIndex = 5,

    /// Action token index for search: {token}{0x00}{event_id:16} -> empty.
    SearchTokens = 6,
}

impl TableId {
    /// Total number of tables.
    pub const COUNT: usize = 7;

    /// All tables, in slot order.
    pub const ALL: [TableId; Self::COUNT] = [
        Self::Events,
        Self::TimeIndex,
        Self::OrgTimeIndex,
        Self::ActionTimeIndex,
        Self::ActorTimeIndex,
        Self::IdempotencyIndex,
        Self::SearchTokens,
    ];

    /// Human-readable table name for logs and diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::TimeIndex => "time_index",
            Self::OrgTimeIndex => "org_time_index",
            Self::ActionTimeIndex => "action_time_index",
            Self::ActorTimeIndex => "actor_time_index",
            Self::IdempotencyIndex => "idempotency_index",
            Self::SearchTokens => "search_tokens",
        }
    }
}

/// Marker trait tying a zero-sized table type to its [`TableId`] slot.
pub trait Table {
    /// The table slot this marker addresses.
    const ID: TableId;
}

/// One ordered table: opaque byte keys to opaque byte values.
pub type TableMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// The full set of tables held by a database.
///
/// Serialized wholesale into the snapshot file by [`FileBackend`]
/// (crate::FileBackend).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSet {
    tables: Vec<TableMap>,
}

impl TableSet {
    /// Creates an empty table set with all [`TableId::COUNT`] tables.
    pub fn new() -> Self {
        Self { tables: vec![TableMap::new(); TableId::COUNT] }
    }

    /// Shared access to one table.
    pub fn table(&self, id: TableId) -> &TableMap {
        &self.tables[id as usize]
    }

    /// Exclusive access to one table.
    pub fn table_mut(&mut self, id: TableId) -> &mut TableMap {
        &mut self.tables[id as usize]
    }

    /// Total entries across all tables.
    pub fn total_entries(&self) -> usize {
        self.tables.iter().map(BTreeMap::len).sum()
    }

    /// Validates that a deserialized snapshot has the expected table count.
    pub(crate) fn check_shape(&self) -> Result<(), crate::Error> {
        if self.tables.len() != TableId::COUNT {
            return Err(crate::Error::Corrupted {
                reason: format!(
                    "expected {} tables, snapshot has {}",
                    TableId::COUNT,
                    self.tables.len()
                ),
            });
        }
        Ok(())
    }
}

impl Default for TableSet {
    fn default() -> Self {
        Self::new()
    }
}
