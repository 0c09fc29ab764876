//! Windowed counting over the event set.
//!
//! Tenant-scoped stats ride the organization-time index, so the window is
//! bounded by the key range itself. Unscoped stats scan the whole primary
//! table and filter the window in memory — exact counts at the cost of a
//! full-table pass.

use papertrail_store::ReadTransaction;
use papertrail_types::{Event, EventStats};
use snafu::ResultExt;

use crate::error::{CodecSnafu, Result, StorageSnafu};
use crate::event_store::{EventStore, Events, OrgTimeIndex};
use crate::keys;

/// Default stats window: the most recent 30 days.
pub const DEFAULT_WINDOW_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Parameters for [`stats`].
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct StatsQuery {
    /// Tenant scope; `None` counts across all tenants and unscoped events.
    #[builder(into)]
    pub organization_id: Option<String>,
    /// Inclusive window start in Unix milliseconds. Defaults to 30 days ago.
    pub start_ms: Option<u64>,
    /// Inclusive window end in Unix milliseconds. Defaults to now.
    pub end_ms: Option<u64>,
}

/// Counts events in the window: a total plus frequency maps keyed by action,
/// actor kind, and result. Counts are exact over the scanned set.
///
/// # Errors
///
/// Returns storage or codec errors from the underlying store.
pub fn stats(txn: &ReadTransaction<'_>, query: &StatsQuery, now_ms: u64) -> Result<EventStats> {
    let end_ms = query.end_ms.unwrap_or(now_ms);
    let start_ms = query.start_ms.unwrap_or_else(|| now_ms.saturating_sub(DEFAULT_WINDOW_MS));

    let mut out = EventStats::default();
    if start_ms > end_ms {
        return Ok(out);
    }
    if let Some(org) = query.organization_id.as_deref() {
        let scope = keys::org_hash(org);
        let start = keys::scoped_time_prefix(scope, start_ms).to_vec();
        let end = keys::scoped_scan_end(scope, end_ms);
        for (key, _) in txn.range::<OrgTimeIndex>(Some(&start), Some(&end)).context(StorageSnafu)? {
            let Some(id) = keys::id_from_index_key(&key) else {
                continue;
            };
            let Some(event) = EventStore::get(txn, id)? else {
                continue;
            };
            // Hash-collision guard
            if event.organization_id.as_deref() == Some(org) {
                tally(&mut out, &event);
            }
        }
    } else {
        for (_, value) in txn.iter::<Events>().context(StorageSnafu)? {
            let event: Event = papertrail_types::decode(&value).context(CodecSnafu)?;
            let ts = event.occurred_at_ms();
            if ts >= start_ms && ts <= end_ms {
                tally(&mut out, &event);
            }
        }
    }
    Ok(out)
}

fn tally(stats: &mut EventStats, event: &Event) {
    stats.total_events += 1;
    *stats.events_by_action.entry(event.action.clone()).or_insert(0) += 1;
    *stats.events_by_actor_kind.entry(event.actor.kind.as_str().to_string()).or_insert(0) += 1;
    *stats.events_by_result.entry(event.result.as_str().to_string()).or_insert(0) += 1;
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use papertrail_store::{Database, InMemoryBackend};
    use papertrail_types::{Actor, ActorKind, EventDraft};

    use super::*;
    use crate::write;

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    fn db_with_event_at(occurred_ms: u64) -> Database<InMemoryBackend> {
        let db = Database::open_in_memory().expect("open");
        let mut txn = db.write().expect("write txn");
        let draft = EventDraft::builder()
            .action("system.job_ran")
            .actor(Actor::new(ActorKind::System, "scheduler"))
            .occurred_at(Utc.timestamp_millis_opt(occurred_ms as i64).single().expect("ts"))
            .build();
        write::log(&mut txn, draft, Utc::now()).expect("log");
        txn.commit().expect("commit");
        db
    }

    #[test]
    fn default_window_start_is_anchored_to_now() {
        // Event well before an explicit far-future end bound. The default
        // start must follow now, not trail the supplied end.
        let db = db_with_event_at(1_000);
        let txn = db.read().expect("read txn");

        let query = StatsQuery::builder().end_ms(100 * DAY_MS).build();
        let now_ms = 1_000 + DAY_MS;
        assert_eq!(stats(&txn, &query, now_ms).expect("stats").total_events, 1);

        // Once now has moved more than 30 days past the event, the default
        // window no longer covers it.
        let now_ms = 1_000 + 31 * DAY_MS;
        assert_eq!(stats(&txn, &query, now_ms).expect("stats").total_events, 0);
    }

    #[test]
    fn inverted_window_counts_nothing() {
        let db = db_with_event_at(5_000);
        let txn = db.read().expect("read txn");

        let query = StatsQuery::builder().start_ms(9_000).end_ms(1_000).build();
        assert_eq!(stats(&txn, &query, 10_000).expect("stats").total_events, 0);
    }
}
