//! Filtered, paginated retrieval.
//!
//! `list` picks exactly one index per call. Filter precedence is
//! `organization_id` > `action` > `(actor_kind, actor_id)` > none; filters
//! supplied alongside a higher-precedence one are ignored rather than
//! intersected (callers needing compound filtering use `search` or
//! post-filter). Scope hashes can collide, so scans re-verify the decoded
//! record against the driving filter before counting it toward the page.

use papertrail_store::{ReadTransaction, Table};
use papertrail_types::{ActorKind, EngineConfig, Event, EventId, ListPage};
use snafu::ResultExt;

use crate::error::{InvalidCursorSnafu, Result, StorageSnafu};
use crate::event_store::{ActionTimeIndex, ActorTimeIndex, EventStore, OrgTimeIndex, TimeIndex};
use crate::keys;

/// Filters and pagination state for [`list`].
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct ListQuery {
    /// Tenant filter. Highest index-selection precedence.
    #[builder(into)]
    pub organization_id: Option<String>,
    /// Action filter. Second precedence.
    #[builder(into)]
    pub action: Option<String>,
    /// Actor filter; both fields must be set for it to drive index selection.
    pub actor_kind: Option<ActorKind>,
    /// Actor filter; both fields must be set for it to drive index selection.
    #[builder(into)]
    pub actor_id: Option<String>,
    /// Inclusive window start in Unix milliseconds. Defaults to 0.
    pub start_ms: Option<u64>,
    /// Inclusive window end in Unix milliseconds. Defaults to unbounded.
    pub end_ms: Option<u64>,
    /// Page size; clamped to the configured maximum.
    pub limit: Option<usize>,
    /// Resume after this event, from a previous page's `next_cursor`.
    pub cursor: Option<EventId>,
}

/// Parameters for [`list_by_actor`].
#[derive(Debug, Clone, bon::Builder)]
pub struct ActorQuery {
    /// Actor kind half of the identity.
    pub actor_kind: ActorKind,
    /// Actor id half of the identity.
    #[builder(into)]
    pub actor_id: String,
    /// Inclusive window start in Unix milliseconds. Defaults to 0.
    pub start_ms: Option<u64>,
    /// Inclusive window end in Unix milliseconds. Defaults to unbounded.
    pub end_ms: Option<u64>,
    /// Result cap; clamped to the configured maximum.
    pub limit: Option<usize>,
}

/// Parameters for [`list_by_action`].
#[derive(Debug, Clone, bon::Builder)]
pub struct ActionQuery {
    /// The action to match exactly.
    #[builder(into)]
    pub action: String,
    /// Optional tenant post-filter, applied in memory after the index scan.
    #[builder(into)]
    pub organization_id: Option<String>,
    /// Inclusive window start in Unix milliseconds. Defaults to 0.
    pub start_ms: Option<u64>,
    /// Inclusive window end in Unix milliseconds. Defaults to unbounded.
    pub end_ms: Option<u64>,
    /// Result cap; clamped to the configured maximum.
    pub limit: Option<usize>,
}

/// Clamps a requested page size into `1..=max_page_size`, defaulting when
/// absent.
pub(crate) fn effective_limit(requested: Option<usize>, config: &EngineConfig) -> usize {
    requested.unwrap_or(config.default_page_size).clamp(1, config.max_page_size)
}

/// Direct lookup by id. A miss is `Ok(None)`, not an error.
///
/// # Errors
///
/// Returns storage or codec errors from the underlying store.
pub fn get(txn: &ReadTransaction<'_>, id: EventId) -> Result<Option<Event>> {
    EventStore::get(txn, id)
}

/// Lists events most-recent-first through the single index chosen by filter
/// precedence, with `limit + 1` peek-ahead pagination.
///
/// # Errors
///
/// Returns [`EngineError::InvalidCursor`](crate::EngineError::InvalidCursor)
/// when the cursor references an event that no longer exists, and storage or
/// codec errors from the underlying store.
pub fn list(txn: &ReadTransaction<'_>, query: &ListQuery, config: &EngineConfig) -> Result<ListPage> {
    let limit = effective_limit(query.limit, config);
    let start_ms = query.start_ms.unwrap_or(0);
    let end_ms = query.end_ms.unwrap_or(u64::MAX);

    // Resolve the cursor to its position in the chosen index; scans resume
    // strictly before it (descending order).
    let cursor_pos = match query.cursor {
        Some(cursor) => match EventStore::get(txn, cursor)? {
            Some(event) => Some((event.occurred_at_ms(), cursor)),
            None => return InvalidCursorSnafu { id: cursor }.fail(),
        },
        None => None,
    };

    let fetch = limit + 1;
    let events = if let Some(org) = query.organization_id.as_deref() {
        let scope = keys::org_hash(org);
        scan_scoped_desc::<OrgTimeIndex>(txn, scope, start_ms, end_ms, cursor_pos, fetch, &|e| {
            e.organization_id.as_deref() == Some(org)
        })?
    } else if let Some(action) = query.action.as_deref() {
        let scope = keys::action_hash(action);
        scan_scoped_desc::<ActionTimeIndex>(txn, scope, start_ms, end_ms, cursor_pos, fetch, &|e| {
            e.action == action
        })?
    } else if let (Some(kind), Some(actor_id)) = (query.actor_kind, query.actor_id.as_deref()) {
        let scope = keys::actor_hash(kind, actor_id);
        scan_scoped_desc::<ActorTimeIndex>(txn, scope, start_ms, end_ms, cursor_pos, fetch, &|e| {
            e.actor.kind == kind && e.actor.id == actor_id
        })?
    } else {
        scan_global_desc(txn, start_ms, end_ms, cursor_pos, fetch)?
    };

    Ok(page_from(events, limit))
}

/// Lists events for one actor identity, most recent first. No cursor; callers
/// page manually via the time bounds.
///
/// # Errors
///
/// Returns storage or codec errors from the underlying store.
pub fn list_by_actor(
    txn: &ReadTransaction<'_>,
    query: &ActorQuery,
    config: &EngineConfig,
) -> Result<Vec<Event>> {
    let limit = effective_limit(query.limit, config);
    let scope = keys::actor_hash(query.actor_kind, &query.actor_id);
    scan_scoped_desc::<ActorTimeIndex>(
        txn,
        scope,
        query.start_ms.unwrap_or(0),
        query.end_ms.unwrap_or(u64::MAX),
        None,
        limit,
        &|e| e.actor.kind == query.actor_kind && e.actor.id == query.actor_id,
    )
}

/// Lists events for one action, most recent first, optionally narrowed to a
/// tenant.
///
/// The tenant filter is approximate: the scan fetches
/// `action_overfetch_factor × limit` candidates from the action index, then
/// post-filters by organization in memory. When matching-action events exist
/// beyond that window, a tenant-filtered call may under-report.
///
/// # Errors
///
/// Returns storage or codec errors from the underlying store.
pub fn list_by_action(
    txn: &ReadTransaction<'_>,
    query: &ActionQuery,
    config: &EngineConfig,
) -> Result<Vec<Event>> {
    let limit = effective_limit(query.limit, config);
    let fetch = if query.organization_id.is_some() {
        limit.saturating_mul(config.action_overfetch_factor)
    } else {
        limit
    };

    let scope = keys::action_hash(&query.action);
    let mut events = scan_scoped_desc::<ActionTimeIndex>(
        txn,
        scope,
        query.start_ms.unwrap_or(0),
        query.end_ms.unwrap_or(u64::MAX),
        None,
        fetch,
        &|e| e.action == query.action,
    )?;

    if let Some(org) = query.organization_id.as_deref() {
        events.retain(|e| e.organization_id.as_deref() == Some(org));
    }
    events.truncate(limit);
    Ok(events)
}

/// Descending scan of a scoped time index, loading and verifying each
/// candidate. Stops after `fetch` accepted events.
fn scan_scoped_desc<T: Table>(
    txn: &ReadTransaction<'_>,
    scope: u64,
    start_ms: u64,
    end_ms: u64,
    cursor_pos: Option<(u64, EventId)>,
    fetch: usize,
    accept: &dyn Fn(&Event) -> bool,
) -> Result<Vec<Event>> {
    let start = keys::scoped_time_prefix(scope, start_ms).to_vec();
    let mut end = keys::scoped_scan_end(scope, end_ms);
    if let Some((cursor_ms, cursor)) = cursor_pos {
        let cursor_key = keys::scoped_time_key(scope, cursor_ms, cursor).to_vec();
        end = end.min(cursor_key);
    }
    collect_desc::<T>(txn, &start, &end, fetch, accept)
}

/// Descending scan of the global time index. No scope hash, so no collision
/// check; every decoded event within the bounds is accepted.
fn scan_global_desc(
    txn: &ReadTransaction<'_>,
    start_ms: u64,
    end_ms: u64,
    cursor_pos: Option<(u64, EventId)>,
    fetch: usize,
) -> Result<Vec<Event>> {
    let start = keys::time_prefix(start_ms).to_vec();
    let mut end = keys::time_scan_end(end_ms);
    if let Some((cursor_ms, cursor)) = cursor_pos {
        let cursor_key = keys::time_key(cursor_ms, cursor).to_vec();
        end = end.min(cursor_key);
    }
    collect_desc::<TimeIndex>(txn, &start, &end, fetch, &|_| true)
}

fn collect_desc<T: Table>(
    txn: &ReadTransaction<'_>,
    start: &[u8],
    end: &[u8],
    fetch: usize,
    accept: &dyn Fn(&Event) -> bool,
) -> Result<Vec<Event>> {
    let mut out = Vec::new();
    if start >= end || fetch == 0 {
        return Ok(out);
    }
    for (key, _) in txn.range::<T>(Some(start), Some(end)).context(StorageSnafu)?.rev() {
        let Some(id) = keys::id_from_index_key(&key) else {
            continue;
        };
        let Some(event) = EventStore::get(txn, id)? else {
            // Orphaned index row; skip rather than fail the whole page
            continue;
        };
        if accept(&event) {
            out.push(event);
            if out.len() >= fetch {
                break;
            }
        }
    }
    Ok(out)
}

/// Converts a `limit + 1` peek-ahead fetch into a page: the extra event is
/// discarded but sets `has_more`, and `next_cursor` is the last kept id.
fn page_from(mut events: Vec<Event>, limit: usize) -> ListPage {
    let has_more = events.len() > limit;
    events.truncate(limit);
    let next_cursor = if has_more { events.last().map(|e| e.id) } else { None };
    ListPage { events, next_cursor, has_more }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with_id(byte: u8) -> Event {
        use chrono::Utc;
        use papertrail_types::{Actor, EventDraft};

        EventDraft::builder()
            .action("user.signed_in")
            .actor(Actor::new(ActorKind::User, "u1"))
            .build()
            .into_event(EventId([byte; 16]), Utc::now())
    }

    #[test]
    fn effective_limit_defaults_and_clamps() {
        let config = EngineConfig::default();
        assert_eq!(effective_limit(None, &config), config.default_page_size);
        assert_eq!(effective_limit(Some(0), &config), 1);
        assert_eq!(effective_limit(Some(10), &config), 10);
        assert_eq!(effective_limit(Some(usize::MAX), &config), config.max_page_size);
    }

    #[test]
    fn page_from_peek_ahead() {
        let full = vec![event_with_id(1), event_with_id(2), event_with_id(3)];
        let page = page_from(full, 2);
        assert_eq!(page.events.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.next_cursor, Some(EventId([2; 16])));

        let exact = vec![event_with_id(1), event_with_id(2)];
        let page = page_from(exact, 2);
        assert_eq!(page.events.len(), 2);
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);

        let page = page_from(Vec::new(), 2);
        assert!(page.events.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }
}
