//! Token-prefix search over action names.
//!
//! The query is tokenized the same way actions are at write time; each query
//! token must prefix-match at least one indexed token of a candidate event,
//! and candidates must satisfy every token (intersection). Results come back
//! in id order — callers must not assume time-descending order here.

use std::collections::BTreeSet;

use papertrail_store::ReadTransaction;
use papertrail_types::{EngineConfig, Event, EventId};
use snafu::ResultExt;

use crate::error::{Result, StorageSnafu};
use crate::event_store::{EventStore, SearchTokens};
use crate::keys;
use crate::read::effective_limit;

/// Parameters for [`search`].
#[derive(Debug, Clone, bon::Builder)]
pub struct SearchQuery {
    /// Free text matched against action tokens by prefix.
    #[builder(into)]
    pub query: String,
    /// Optional exact-match tenant filter.
    #[builder(into)]
    pub organization_id: Option<String>,
    /// Optional exact-match actor-id filter (any actor kind).
    #[builder(into)]
    pub actor_id: Option<String>,
    /// Result cap; clamped to the configured maximum.
    pub limit: Option<usize>,
}

/// Finds events whose action matches every query token by prefix, optionally
/// narrowed by tenant and actor id.
///
/// An empty or all-punctuation query matches nothing.
///
/// # Errors
///
/// Returns storage or codec errors from the underlying store.
pub fn search(
    txn: &ReadTransaction<'_>,
    query: &SearchQuery,
    config: &EngineConfig,
) -> Result<Vec<Event>> {
    let tokens = keys::tokenize(&query.query);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates: Option<BTreeSet<EventId>> = None;
    for token in &tokens {
        let ids = ids_with_token_prefix(txn, token)?;
        candidates = Some(match candidates {
            None => ids,
            Some(prev) => prev.intersection(&ids).copied().collect(),
        });
        if candidates.as_ref().is_some_and(BTreeSet::is_empty) {
            break;
        }
    }

    let limit = effective_limit(query.limit, config);
    let mut out = Vec::new();
    for id in candidates.unwrap_or_default() {
        if out.len() >= limit {
            break;
        }
        let Some(event) = EventStore::get(txn, id)? else {
            continue;
        };
        if let Some(org) = query.organization_id.as_deref() {
            if event.organization_id.as_deref() != Some(org) {
                continue;
            }
        }
        if let Some(actor_id) = query.actor_id.as_deref() {
            if event.actor.id != actor_id {
                continue;
            }
        }
        out.push(event);
    }
    Ok(out)
}

/// Collects the ids of every event indexed under a token starting with
/// `prefix`.
fn ids_with_token_prefix(txn: &ReadTransaction<'_>, prefix: &str) -> Result<BTreeSet<EventId>> {
    let start = prefix.as_bytes();
    let end = keys::prefix_scan_end(start);
    let mut ids = BTreeSet::new();
    for (key, _) in txn.range::<SearchTokens>(Some(start), end.as_deref()).context(StorageSnafu)? {
        if let Some(id) = keys::id_from_index_key(&key) {
            ids.insert(id);
        }
    }
    Ok(ids)
}
