//! Low-level event storage operations on raw transactions.
//!
//! [`EventStore`] is stateless — every operation takes a transaction
//! reference. Writes maintain the primary table and all five secondary
//! structures together, so indexes never commit out of step with records.

use papertrail_store::{ReadTransaction, StorageBackend, Table, TableId, WriteTransaction};
use papertrail_types::{Event, EventId};
use snafu::ResultExt;

use crate::error::{CodecSnafu, Result, StorageSnafu};
use crate::keys;

/// Primary event table: event id -> serialized [`Event`].
pub struct Events;

impl Table for Events {
    const ID: TableId = TableId::Events;
}

/// Global time index for unfiltered listing and unscoped retention.
pub struct TimeIndex;

impl Table for TimeIndex {
    const ID: TableId = TableId::TimeIndex;
}

/// Tenant-scoped time index.
pub struct OrgTimeIndex;

impl Table for OrgTimeIndex {
    const ID: TableId = TableId::OrgTimeIndex;
}

/// Action-scoped time index.
pub struct ActionTimeIndex;

impl Table for ActionTimeIndex {
    const ID: TableId = TableId::ActionTimeIndex;
}

/// Actor-scoped time index.
pub struct ActorTimeIndex;

impl Table for ActorTimeIndex {
    const ID: TableId = TableId::ActorTimeIndex;
}

/// Unique deduplication index: idempotency key -> event id.
pub struct IdempotencyIndex;

impl Table for IdempotencyIndex {
    const ID: TableId = TableId::IdempotencyIndex;
}

/// Action token index backing search.
pub struct SearchTokens;

impl Table for SearchTokens {
    const ID: TableId = TableId::SearchTokens;
}

/// Stateless low-level storage operations for events.
pub struct EventStore;

impl EventStore {
    /// Writes an event and every applicable index row.
    ///
    /// The caller is responsible for idempotency-key uniqueness (checked on
    /// the write path before calling this) and for committing the
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns a codec error if serialization fails, or a storage error if
    /// any insert fails.
    pub fn insert<B: StorageBackend>(
        txn: &mut WriteTransaction<'_, B>,
        event: &Event,
    ) -> Result<()> {
        let value = papertrail_types::encode(event).context(CodecSnafu)?;
        let id = event.id;
        let ts = event.occurred_at_ms();

        txn.insert::<Events>(id.as_bytes(), &value).context(StorageSnafu)?;
        txn.insert::<TimeIndex>(&keys::time_key(ts, id), &[]).context(StorageSnafu)?;

        if let Some(org) = &event.organization_id {
            let key = keys::scoped_time_key(keys::org_hash(org), ts, id);
            txn.insert::<OrgTimeIndex>(&key, &[]).context(StorageSnafu)?;
        }

        let action_key = keys::scoped_time_key(keys::action_hash(&event.action), ts, id);
        txn.insert::<ActionTimeIndex>(&action_key, &[]).context(StorageSnafu)?;

        let actor_scope = keys::actor_hash(event.actor.kind, &event.actor.id);
        let actor_key = keys::scoped_time_key(actor_scope, ts, id);
        txn.insert::<ActorTimeIndex>(&actor_key, &[]).context(StorageSnafu)?;

        if let Some(idem) = &event.idempotency_key {
            txn.insert::<IdempotencyIndex>(idem.as_bytes(), id.as_bytes())
                .context(StorageSnafu)?;
        }

        for token in keys::tokenize(&event.action) {
            txn.insert::<SearchTokens>(&keys::token_key(&token, id), &[])
                .context(StorageSnafu)?;
        }

        Ok(())
    }

    /// Deletes an event and every index row written for it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if any delete fails.
    pub fn remove<B: StorageBackend>(
        txn: &mut WriteTransaction<'_, B>,
        event: &Event,
    ) -> Result<()> {
        let id = event.id;
        let ts = event.occurred_at_ms();

        txn.delete::<Events>(id.as_bytes()).context(StorageSnafu)?;
        txn.delete::<TimeIndex>(&keys::time_key(ts, id)).context(StorageSnafu)?;

        if let Some(org) = &event.organization_id {
            let key = keys::scoped_time_key(keys::org_hash(org), ts, id);
            txn.delete::<OrgTimeIndex>(&key).context(StorageSnafu)?;
        }

        let action_key = keys::scoped_time_key(keys::action_hash(&event.action), ts, id);
        txn.delete::<ActionTimeIndex>(&action_key).context(StorageSnafu)?;

        let actor_scope = keys::actor_hash(event.actor.kind, &event.actor.id);
        txn.delete::<ActorTimeIndex>(&keys::scoped_time_key(actor_scope, ts, id))
            .context(StorageSnafu)?;

        if let Some(idem) = &event.idempotency_key {
            txn.delete::<IdempotencyIndex>(idem.as_bytes()).context(StorageSnafu)?;
        }

        for token in keys::tokenize(&event.action) {
            txn.delete::<SearchTokens>(&keys::token_key(&token, id)).context(StorageSnafu)?;
        }

        Ok(())
    }

    /// Overwrites the primary record only, leaving index rows untouched.
    ///
    /// Valid only for mutations that change no indexed field — the
    /// metadata/tags patch path.
    ///
    /// # Errors
    ///
    /// Returns a codec error if serialization fails, or a storage error if
    /// the insert fails.
    pub fn overwrite_primary<B: StorageBackend>(
        txn: &mut WriteTransaction<'_, B>,
        event: &Event,
    ) -> Result<()> {
        let value = papertrail_types::encode(event).context(CodecSnafu)?;
        txn.insert::<Events>(event.id.as_bytes(), &value).context(StorageSnafu)?;
        Ok(())
    }

    /// Direct lookup by id in a read transaction. A miss is `None`, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails, or a codec error if the
    /// stored record fails to deserialize.
    pub fn get(txn: &ReadTransaction<'_>, id: EventId) -> Result<Option<Event>> {
        match txn.get::<Events>(id.as_bytes()).context(StorageSnafu)? {
            Some(data) => {
                let event: Event = papertrail_types::decode(&data).context(CodecSnafu)?;
                Ok(Some(event))
            },
            None => Ok(None),
        }
    }

    /// Direct lookup by id through a write transaction's overlay.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails, or a codec error if the
    /// stored record fails to deserialize.
    pub fn get_pending<B: StorageBackend>(
        txn: &WriteTransaction<'_, B>,
        id: EventId,
    ) -> Result<Option<Event>> {
        match txn.get::<Events>(id.as_bytes()).context(StorageSnafu)? {
            Some(data) => {
                let event: Event = papertrail_types::decode(&data).context(CodecSnafu)?;
                Ok(Some(event))
            },
            None => Ok(None),
        }
    }

    /// Resolves an idempotency key to the id of the event holding it,
    /// observing the transaction's own pending writes — a duplicate key
    /// inside one batch dedups against the earlier element of that batch.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub fn resolve_idempotency_key<B: StorageBackend>(
        txn: &WriteTransaction<'_, B>,
        key: &str,
    ) -> Result<Option<EventId>> {
        let value = txn.get::<IdempotencyIndex>(key.as_bytes()).context(StorageSnafu)?;
        Ok(value.as_deref().and_then(EventId::from_slice))
    }
}
