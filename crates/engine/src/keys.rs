//! Index key encoding for the event tables.
//!
//! All indexes share one layout discipline: an optional 8-byte scope hash,
//! then the event time in big-endian milliseconds, then the 16-byte event id
//! as a unique suffix:
//!
//! ```text
//! ┌────────────────────┬──────────────────┬──────────────┐
//! │ scope_hash (8BE)?  │ occurred_ms (8BE)│ event_id (16)│
//! └────────────────────┴──────────────────┴──────────────┘
//! ```
//!
//! Big-endian encoding makes lexicographic ordering match numeric ordering,
//! so range scans naturally produce chronologically ordered results within a
//! scope, and reverse scans produce most-recent-first pages.
//!
//! Scope hashes (`seahash` of the organization id, action, or actor identity)
//! are equality buckets, not proofs: two scopes may collide, so every scan
//! re-checks the decoded record against its filter before counting it.

use papertrail_types::{ActorKind, EventId};

/// Length of the time + id portion shared by all time indexes.
pub const TIME_ID_LEN: usize = 8 + EventId::LEN;

/// Length of a scoped index key: scope hash + time + id.
pub const SCOPED_KEY_LEN: usize = 8 + TIME_ID_LEN;

/// Separator between a search token and its event-id suffix. Tokens are
/// lowercase alphanumerics, so 0x00 can never appear inside one.
pub const TOKEN_SEPARATOR: u8 = 0x00;

/// Scope hash for an organization id.
pub fn org_hash(organization_id: &str) -> u64 {
    seahash::hash(organization_id.as_bytes())
}

/// Scope hash for an action string.
pub fn action_hash(action: &str) -> u64 {
    seahash::hash(action.as_bytes())
}

/// Scope hash for an actor identity key `(kind, id)`.
pub fn actor_hash(kind: ActorKind, actor_id: &str) -> u64 {
    let mut buf = Vec::with_capacity(kind.as_str().len() + 1 + actor_id.len());
    buf.extend_from_slice(kind.as_str().as_bytes());
    buf.push(0x00);
    buf.extend_from_slice(actor_id.as_bytes());
    seahash::hash(&buf)
}

/// Global time index key: `occurred_ms ++ id`.
pub fn time_key(occurred_ms: u64, id: EventId) -> [u8; TIME_ID_LEN] {
    let mut key = [0u8; TIME_ID_LEN];
    key[..8].copy_from_slice(&occurred_ms.to_be_bytes());
    key[8..].copy_from_slice(id.as_bytes());
    key
}

/// Scoped time index key: `scope_hash ++ occurred_ms ++ id`.
pub fn scoped_time_key(scope_hash: u64, occurred_ms: u64, id: EventId) -> [u8; SCOPED_KEY_LEN] {
    let mut key = [0u8; SCOPED_KEY_LEN];
    key[..8].copy_from_slice(&scope_hash.to_be_bytes());
    key[8..16].copy_from_slice(&occurred_ms.to_be_bytes());
    key[16..].copy_from_slice(id.as_bytes());
    key
}

/// Prefix of all global time index keys at or after `occurred_ms`.
pub fn time_prefix(occurred_ms: u64) -> [u8; 8] {
    occurred_ms.to_be_bytes()
}

/// Prefix of all scoped keys for `scope_hash` at or after `occurred_ms`.
pub fn scoped_time_prefix(scope_hash: u64, occurred_ms: u64) -> [u8; 16] {
    let mut prefix = [0u8; 16];
    prefix[..8].copy_from_slice(&scope_hash.to_be_bytes());
    prefix[8..].copy_from_slice(&occurred_ms.to_be_bytes());
    prefix
}

/// Exclusive upper bound for a global time scan with inclusive `end_ms`.
pub fn time_scan_end(end_ms: u64) -> Vec<u8> {
    match end_ms.checked_add(1) {
        Some(next) => time_prefix(next).to_vec(),
        // end_ms saturates the key space: exceed any real key's length
        None => {
            let mut key = time_prefix(u64::MAX).to_vec();
            key.extend_from_slice(&[0xFF; EventId::LEN + 1]);
            key
        },
    }
}

/// Exclusive upper bound for a scoped time scan with inclusive `end_ms`.
pub fn scoped_scan_end(scope_hash: u64, end_ms: u64) -> Vec<u8> {
    match end_ms.checked_add(1) {
        Some(next) => scoped_time_prefix(scope_hash, next).to_vec(),
        None => {
            let mut key = scoped_time_prefix(scope_hash, u64::MAX).to_vec();
            key.extend_from_slice(&[0xFF; EventId::LEN + 1]);
            key
        },
    }
}

/// Extracts the event id from the trailing 16 bytes of an index key.
///
/// Returns `None` for keys too short to carry an id suffix.
pub fn id_from_index_key(key: &[u8]) -> Option<EventId> {
    if key.len() < EventId::LEN {
        return None;
    }
    EventId::from_slice(&key[key.len() - EventId::LEN..])
}

/// Search token index key: `token ++ 0x00 ++ id`.
pub fn token_key(token: &str, id: EventId) -> Vec<u8> {
    let mut key = Vec::with_capacity(token.len() + 1 + EventId::LEN);
    key.extend_from_slice(token.as_bytes());
    key.push(TOKEN_SEPARATOR);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Exclusive upper bound covering every key that starts with `prefix`.
///
/// Returns `None` when the prefix is all 0xFF bytes, meaning the scan is
/// unbounded above.
pub fn prefix_scan_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return Some(end);
        }
        end.pop();
    }
    None
}

/// Splits an action into lowercase search tokens.
///
/// Tokens are maximal runs of alphanumerics; dots, underscores, and any other
/// punctuation separate them. Duplicates collapse, order follows first
/// appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut tokens = Vec::new();
    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        if raw.is_empty() {
            continue;
        }
        let token = raw.to_lowercase();
        if seen.insert(token.clone()) {
            tokens.push(token);
        }
    }
    tokens
}
