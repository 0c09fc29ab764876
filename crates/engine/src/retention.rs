//! Batched pruning of old events.
//!
//! One invocation deletes at most one batch; the scheduler re-invokes until
//! `has_more` is false. Candidates are collected first and deleted second, so
//! the range scan never observes its own mutations.

use papertrail_store::{StorageBackend, WriteTransaction};
use papertrail_types::{EngineConfig, Event, EventId, RetentionOutcome};
use snafu::ResultExt;

use crate::error::{Result, StorageSnafu};
use crate::event_store::{EventStore, OrgTimeIndex, TimeIndex};
use crate::keys;

/// Parameters for [`delete_old_events`].
#[derive(Debug, Clone, bon::Builder)]
pub struct RetentionRequest {
    /// Exclusive cutoff: events with `occurred_at < older_than_ms` qualify.
    pub older_than_ms: u64,
    /// Restrict pruning to one tenant's events.
    #[builder(into)]
    pub organization_id: Option<String>,
    /// Batch size; defaults to the configured `retention_batch_size`.
    pub batch_size: Option<usize>,
}

/// Deletes up to one batch of events older than the cutoff, scoped to a
/// tenant when requested. Returns how many were deleted and whether
/// qualifying events remain.
///
/// # Errors
///
/// Returns storage or codec errors from the underlying store; the caller's
/// transaction should then be dropped, aborting the partial batch.
pub fn delete_old_events<B: StorageBackend>(
    txn: &mut WriteTransaction<'_, B>,
    request: &RetentionRequest,
    config: &EngineConfig,
) -> Result<RetentionOutcome> {
    let batch = request.batch_size.unwrap_or(config.retention_batch_size).max(1);

    // Collect one extra candidate id to learn whether more remain. The fetch
    // saturates so an unbounded caller batch size cannot overflow.
    let fetch = batch.saturating_add(1);
    let candidate_ids = match request.organization_id.as_deref() {
        Some(org) => scoped_candidates(txn, org, request.older_than_ms, fetch)?,
        None => global_candidates(txn, request.older_than_ms, fetch)?,
    };
    let has_more = candidate_ids.len() > batch;

    let mut deleted = 0;
    for id in candidate_ids.into_iter().take(batch) {
        if let Some(event) = EventStore::get_pending(txn, id)? {
            EventStore::remove(txn, &event)?;
            deleted += 1;
        }
    }

    tracing::debug!(
        deleted,
        has_more,
        organization_id = request.organization_id.as_deref().unwrap_or("<all>"),
        "retention batch complete"
    );
    Ok(RetentionOutcome { deleted, has_more })
}

/// Candidate ids from the organization-time index, strictly before the
/// cutoff, verified against the tenant to guard hash collisions.
fn scoped_candidates<B: StorageBackend>(
    txn: &WriteTransaction<'_, B>,
    org: &str,
    older_than_ms: u64,
    fetch: usize,
) -> Result<Vec<EventId>> {
    let scope = keys::org_hash(org);
    let start = keys::scoped_time_prefix(scope, 0).to_vec();
    // `occurred_at < older_than_ms`, so the cutoff prefix itself is the
    // exclusive upper bound.
    let end = keys::scoped_time_prefix(scope, older_than_ms).to_vec();

    let mut ids = Vec::new();
    for (key, _) in txn.range::<OrgTimeIndex>(Some(&start), Some(&end)).context(StorageSnafu)? {
        if ids.len() >= fetch {
            break;
        }
        let Some(id) = keys::id_from_index_key(&key) else {
            continue;
        };
        let Some(event) = EventStore::get_pending(txn, id)? else {
            continue;
        };
        if matches_org(&event, org) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Candidate ids from the global time index, strictly before the cutoff.
fn global_candidates<B: StorageBackend>(
    txn: &WriteTransaction<'_, B>,
    older_than_ms: u64,
    fetch: usize,
) -> Result<Vec<EventId>> {
    let end = keys::time_prefix(older_than_ms).to_vec();
    let mut ids = Vec::new();
    for (key, _) in txn.range::<TimeIndex>(None, Some(&end)).context(StorageSnafu)? {
        if ids.len() >= fetch {
            break;
        }
        if let Some(id) = keys::id_from_index_key(&key) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn matches_org(event: &Event, org: &str) -> bool {
    event.organization_id.as_deref() == Some(org)
}
