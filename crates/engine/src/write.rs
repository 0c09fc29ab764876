//! The idempotent write path.
//!
//! `log` performs the check-then-insert inside the caller's write
//! transaction: the store serializes writers, so the existence check and the
//! insert cannot interleave with another writer and a duplicate key can never
//! slip in between them. Duplicates are conflict-avoided, not
//! conflict-reported — the existing event is returned with `created: false`.

use chrono::{DateTime, Utc};
use papertrail_store::{StorageBackend, WriteTransaction};
use papertrail_types::{EventDraft, EventId, LogOutcome};

use crate::error::Result;
use crate::event_store::EventStore;

/// Inserts one event, deduplicating on `idempotency_key`.
///
/// The lookup observes the transaction's own pending writes, so a key
/// duplicated within one batch resolves to the earlier element of that batch.
///
/// # Errors
///
/// Returns storage or codec errors from the underlying store.
pub fn log<B: StorageBackend>(
    txn: &mut WriteTransaction<'_, B>,
    draft: EventDraft,
    now: DateTime<Utc>,
) -> Result<LogOutcome> {
    if let Some(key) = draft.idempotency_key.as_deref() {
        if let Some(existing) = EventStore::resolve_idempotency_key(txn, key)? {
            tracing::debug!(event_id = %existing, "idempotency key already taken");
            return Ok(LogOutcome { event_id: existing, created: false });
        }
    }

    let event = draft.into_event(EventId::generate(), now);
    EventStore::insert(txn, &event)?;
    tracing::debug!(event_id = %event.id, action = %event.action, "logged event");
    Ok(LogOutcome { event_id: event.id, created: true })
}

/// Inserts a batch of events sequentially within one transaction, preserving
/// input order in the result sequence. The batch commits or aborts as a
/// whole; per-element `created` flags are the only partial-success signal.
///
/// # Errors
///
/// Returns the first storage or codec error; the caller's transaction should
/// then be dropped, aborting the whole batch.
pub fn log_batch<B: StorageBackend>(
    txn: &mut WriteTransaction<'_, B>,
    drafts: Vec<EventDraft>,
    now: DateTime<Utc>,
) -> Result<Vec<LogOutcome>> {
    let mut outcomes = Vec::with_capacity(drafts.len());
    for draft in drafts {
        outcomes.push(log(txn, draft, now)?);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use papertrail_store::{Database, InMemoryBackend};
    use papertrail_types::{Actor, ActorKind};

    use super::*;

    fn draft(action: &str, key: Option<&str>) -> EventDraft {
        EventDraft::builder()
            .action(action)
            .actor(Actor::new(ActorKind::User, "u1"))
            .maybe_idempotency_key(key)
            .build()
    }

    #[test]
    fn duplicate_key_within_batch_dedups_against_earlier_element() {
        let db = Database::<InMemoryBackend>::open_in_memory().expect("open");
        let mut txn = db.write().expect("write txn");

        let outcomes = log_batch(
            &mut txn,
            vec![
                draft("user.signed_in", Some("k1")),
                draft("user.signed_out", None),
                draft("user.signed_in", Some("k1")),
            ],
            Utc::now(),
        )
        .expect("batch");
        txn.commit().expect("commit");

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].created);
        assert!(outcomes[1].created);
        assert!(!outcomes[2].created, "same key in same batch must dedup");
        assert_eq!(outcomes[2].event_id, outcomes[0].event_id);
    }

    #[test]
    fn aborted_batch_leaves_no_trace() {
        let db = Database::<InMemoryBackend>::open_in_memory().expect("open");
        {
            let mut txn = db.write().expect("write txn");
            log_batch(&mut txn, vec![draft("a.b", None), draft("c.d", None)], Utc::now())
                .expect("batch");
            // Dropped without commit
        }
        assert_eq!(db.total_entries(), 0, "abort must discard the whole batch");
    }
}
