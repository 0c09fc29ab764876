//! The high-level audit log handle.
//!
//! [`AuditLog`] owns the database and configuration and wraps every operation
//! in its own transaction: reads in a read transaction, writes in a write
//! transaction committed before returning. Clones share the same database.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use papertrail_store::{Database, FileBackend, InMemoryBackend, SharedDatabase, StorageBackend};
use papertrail_types::{
    validate_draft, EngineConfig, Event, EventDraft, EventId, EventStats, ListPage, LogOutcome,
    RetentionOutcome,
};
use snafu::ResultExt;

use crate::error::{Result, StorageSnafu, ValidationSnafu};
use crate::read::{ActionQuery, ActorQuery, ListQuery};
use crate::retention::RetentionRequest;
use crate::search::SearchQuery;
use crate::stats::StatsQuery;
use crate::update::EventPatch;
use crate::{read, retention, search, stats, update, write};

/// An audit-event store bound to one database.
pub struct AuditLog<B: StorageBackend> {
    db: SharedDatabase<B>,
    config: EngineConfig,
}

impl<B: StorageBackend> Clone for AuditLog<B> {
    fn clone(&self) -> Self {
        Self { db: Arc::clone(&self.db), config: self.config.clone() }
    }
}

impl AuditLog<FileBackend> {
    /// Opens (or creates) a file-backed audit log with default configuration.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be opened or is corrupt.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, EngineConfig::default())
    }

    /// Opens (or creates) a file-backed audit log.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be opened or is corrupt.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        let db = Database::open(path).context(StorageSnafu)?;
        Ok(Self { db: Arc::new(db), config })
    }
}

impl AuditLog<InMemoryBackend> {
    /// Opens an in-memory audit log with default configuration. Nothing
    /// survives drop; intended for tests and ephemeral use.
    ///
    /// # Errors
    ///
    /// Infallible today; `Result` keeps the constructors uniform.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_config(EngineConfig::default())
    }

    /// Opens an in-memory audit log.
    ///
    /// # Errors
    ///
    /// Infallible today.
    pub fn open_in_memory_with_config(config: EngineConfig) -> Result<Self> {
        let db = Database::open_in_memory().context(StorageSnafu)?;
        Ok(Self { db: Arc::new(db), config })
    }
}

impl<B: StorageBackend> AuditLog<B> {
    /// The configuration this handle was opened with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Logs one event idempotently. Returns the stored event's id and whether
    /// a new record was created.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed drafts, and storage or codec
    /// errors from the underlying store.
    pub fn log(&self, draft: EventDraft) -> Result<LogOutcome> {
        validate_draft(&draft, &self.config).context(ValidationSnafu)?;
        let mut txn = self.db.write().context(StorageSnafu)?;
        let outcome = write::log(&mut txn, draft, Utc::now())?;
        txn.commit().context(StorageSnafu)?;
        Ok(outcome)
    }

    /// Logs a batch of events in one transaction, preserving input order in
    /// the outcomes. The whole batch commits or none of it does; validation
    /// runs over every draft before any write.
    ///
    /// # Errors
    ///
    /// Returns the first validation error without writing anything, and
    /// storage or codec errors from the underlying store.
    pub fn log_batch(&self, drafts: Vec<EventDraft>) -> Result<Vec<LogOutcome>> {
        for draft in &drafts {
            validate_draft(draft, &self.config).context(ValidationSnafu)?;
        }
        let mut txn = self.db.write().context(StorageSnafu)?;
        let outcomes = write::log_batch(&mut txn, drafts, Utc::now())?;
        txn.commit().context(StorageSnafu)?;
        Ok(outcomes)
    }

    /// Direct lookup by id. A miss is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors from the underlying store.
    pub fn get(&self, id: EventId) -> Result<Option<Event>> {
        let txn = self.db.read().context(StorageSnafu)?;
        read::get(&txn, id)
    }

    /// Lists events most-recent-first with single-dimension filtering and
    /// cursor pagination. See [`read::list`].
    ///
    /// # Errors
    ///
    /// Returns an invalid-cursor error for stale cursors, and storage or
    /// codec errors from the underlying store.
    pub fn list(&self, query: &ListQuery) -> Result<ListPage> {
        let txn = self.db.read().context(StorageSnafu)?;
        read::list(&txn, query, &self.config)
    }

    /// Lists events for one actor identity, most recent first.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors from the underlying store.
    pub fn list_by_actor(&self, query: &ActorQuery) -> Result<Vec<Event>> {
        let txn = self.db.read().context(StorageSnafu)?;
        read::list_by_actor(&txn, query, &self.config)
    }

    /// Lists events for one action, optionally narrowed to a tenant. The
    /// tenant filter is approximate; see [`read::list_by_action`].
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors from the underlying store.
    pub fn list_by_action(&self, query: &ActionQuery) -> Result<Vec<Event>> {
        let txn = self.db.read().context(StorageSnafu)?;
        read::list_by_action(&txn, query, &self.config)
    }

    /// Searches events by action-token prefix match. See [`search::search`].
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors from the underlying store.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<Event>> {
        let txn = self.db.read().context(StorageSnafu)?;
        search::search(&txn, query, &self.config)
    }

    /// Counts events in a time window, scoped to a tenant when requested.
    /// The window defaults to the most recent 30 days.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors from the underlying store.
    pub fn stats(&self, query: &StatsQuery) -> Result<EventStats> {
        let txn = self.db.read().context(StorageSnafu)?;
        let now_ms = Utc::now().timestamp_millis().max(0) as u64;
        stats::stats(&txn, query, now_ms)
    }

    /// Deletes up to one batch of events older than the cutoff. Privileged;
    /// invoke repeatedly until `has_more` is false.
    ///
    /// # Errors
    ///
    /// Returns storage or codec errors from the underlying store.
    pub fn delete_old_events(&self, request: &RetentionRequest) -> Result<RetentionOutcome> {
        let mut txn = self.db.write().context(StorageSnafu)?;
        let outcome = retention::delete_old_events(&mut txn, request, &self.config)?;
        txn.commit().context(StorageSnafu)?;
        Ok(outcome)
    }

    /// Patches a stored event's metadata and tags. Privileged; all other
    /// fields are immutable.
    ///
    /// # Errors
    ///
    /// Returns an event-not-found error for unknown ids, and storage or codec
    /// errors from the underlying store.
    pub fn update_event(&self, id: EventId, patch: EventPatch) -> Result<()> {
        let mut txn = self.db.write().context(StorageSnafu)?;
        update::update_event(&mut txn, id, patch)?;
        txn.commit().context(StorageSnafu)?;
        Ok(())
    }
}
