//! Audit event domain types.
//!
//! Provides the core types for the event store:
//! - [`Event`] — one immutable audit record ("who did what to what, when, with
//!   what outcome"), following the canonical log line pattern
//! - [`EventDraft`] — caller input to the write path, minus system fields
//! - [`Actor`], [`Target`], [`EventContext`] — record components
//! - [`EventStats`], [`ListPage`], [`LogOutcome`], [`RetentionOutcome`] —
//!   operation results
//!
//! # Serialization
//!
//! Events use postcard for storage (compact binary, position-dependent) and
//! serde for JSON API responses. Optional fields carry `#[serde(default)]`
//! for forward-compatible JSON deserialization. Postcard serialization order
//! matches struct declaration order — field reorders are breaking changes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned event identifier: the 16 raw bytes of a UUIDv7.
///
/// UUIDv7 is time-ordered, so ids generated in sequence sort roughly
/// chronologically — useful as the final tie-breaking component of index keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct EventId(pub [u8; 16]);

impl EventId {
    /// Length of an event id in bytes.
    pub const LEN: usize = 16;

    /// Generates a fresh time-ordered id.
    pub fn generate() -> Self {
        Self(*Uuid::now_v7().as_bytes())
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Reconstructs an id from raw bytes, typically the suffix of an index key.
    ///
    /// Returns `None` if the slice is not exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0))
    }
}

impl std::str::FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(*Uuid::parse_str(s)?.as_bytes()))
    }
}

/// The kind of identity that performed an action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A human user.
    User,
    /// The system itself (background jobs, migrations).
    System,
    /// An API key acting programmatically.
    ApiKey,
    /// An internal or external service.
    Service,
}

impl ActorKind {
    /// Stable wire name, used in index keys and stats map keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
            Self::ApiKey => "api_key",
            Self::Service => "service",
        }
    }
}

/// Who performed an action. `(kind, id)` is the actor's identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Actor {
    /// Identity class of the actor.
    pub kind: ActorKind,
    /// Identifier within the kind (user id, key id, service name).
    pub id: String,
    /// Display name, if known.
    #[serde(default)]
    pub name: Option<String>,
    /// Email, if known.
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form actor annotations.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Actor {
    /// Convenience constructor for the common kind+id case.
    pub fn new(kind: ActorKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into(), name: None, email: None, metadata: BTreeMap::new() }
    }
}

/// A resource affected by an action. Order within an event is caller-meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Target {
    /// Resource type (free-form, e.g. `"document"`).
    pub kind: String,
    /// Resource identifier.
    pub id: String,
    /// Display name, if known.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form target annotations.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Target {
    /// Convenience constructor for the common kind+id case.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self { kind: kind.into(), id: id.into(), name: None, metadata: BTreeMap::new() }
    }
}

/// Request provenance. Not indexed; carried for display and forensics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventContext {
    /// Caller network location (typically an IP address).
    #[serde(default)]
    pub location: Option<String>,
    /// User agent string.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Coarse geographic location.
    #[serde(default)]
    pub geo_location: Option<String>,
    /// Request correlation id.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Session correlation id.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Outcome of the audited action.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EventResult {
    /// The action completed successfully. Default when unspecified.
    #[default]
    Success,
    /// The action failed.
    Failure,
    /// The action is still in flight.
    Pending,
}

impl EventResult {
    /// Stable wire name, used as the stats map key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Pending => "pending",
        }
    }
}

/// Structured error detail for failed actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable error message.
    #[serde(default)]
    pub message: Option<String>,
}

/// One immutable audit record.
///
/// Created only through the write path; after creation only `metadata` and
/// `tags` may change (via the privileged update operation). Destroyed only by
/// the retention job or direct deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    /// Store-assigned unique id, never reused.
    pub id: EventId,

    /// Store-assigned ingestion timestamp. Distinct from `occurred_at`.
    pub created_at: DateTime<Utc>,

    /// Logical event time, caller-supplied or defaulted to ingestion time.
    /// The primary ordering key within every index. Immutable.
    pub occurred_at: DateTime<Utc>,

    /// Dot-namespaced verb, e.g. `"user.signed_in"`. The first segment is a
    /// display category; arbitrary custom actions are legal.
    pub action: String,

    /// Who performed the action.
    pub actor: Actor,

    /// Resources affected, in caller order.
    #[serde(default)]
    pub targets: Vec<Target>,

    /// Request provenance.
    #[serde(default)]
    pub context: Option<EventContext>,

    /// Opaque caller payload. Mutable via the update operation (shallow merge).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Tenant scope; `None` means global/unscoped.
    #[serde(default)]
    pub organization_id: Option<String>,

    /// Deduplication token: at most one stored event per non-empty key.
    #[serde(default)]
    pub idempotency_key: Option<String>,

    /// Outcome of the action. Defaults to success.
    #[serde(default)]
    pub result: EventResult,

    /// Error detail for failed actions.
    #[serde(default)]
    pub error: Option<ErrorDetail>,

    /// Free-form labels. Mutable via the update operation (wholesale replace).
    #[serde(default)]
    pub tags: Vec<String>,

    /// Caller schema version. Defaults to 1.
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl Event {
    /// `occurred_at` as non-negative milliseconds since the Unix epoch.
    ///
    /// Pre-epoch timestamps clamp to 0 so they encode into index keys without
    /// wrapping; the far past collapses to the epoch, which is harmless for
    /// audit data.
    pub fn occurred_at_ms(&self) -> u64 {
        self.occurred_at.timestamp_millis().max(0) as u64
    }
}

/// Caller input to the write path: an [`Event`] minus system fields.
///
/// `occurred_at` defaults to ingestion time, `result` to success and
/// `version` to 1 when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, bon::Builder)]
pub struct EventDraft {
    /// Dot-namespaced verb.
    #[builder(into)]
    pub action: String,
    /// Who performed the action.
    pub actor: Actor,
    /// Resources affected, in caller order.
    #[serde(default)]
    #[builder(default)]
    pub targets: Vec<Target>,
    /// Request provenance.
    #[serde(default)]
    pub context: Option<EventContext>,
    /// Opaque caller payload.
    #[serde(default)]
    #[builder(default)]
    pub metadata: BTreeMap<String, String>,
    /// Tenant scope.
    #[serde(default)]
    #[builder(into)]
    pub organization_id: Option<String>,
    /// Logical event time; ingestion time when omitted.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Deduplication token.
    #[serde(default)]
    #[builder(into)]
    pub idempotency_key: Option<String>,
    /// Outcome; success when omitted.
    #[serde(default)]
    pub result: Option<EventResult>,
    /// Error detail for failed actions.
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    /// Free-form labels.
    #[serde(default)]
    #[builder(default)]
    pub tags: Vec<String>,
    /// Caller schema version; 1 when omitted.
    #[serde(default)]
    pub version: Option<u32>,
}

impl EventDraft {
    /// Materializes the draft into a full [`Event`] with system fields
    /// assigned, applying the documented defaults.
    pub fn into_event(self, id: EventId, now: DateTime<Utc>) -> Event {
        Event {
            id,
            created_at: now,
            occurred_at: self.occurred_at.unwrap_or(now),
            action: self.action,
            actor: self.actor,
            targets: self.targets,
            context: self.context,
            metadata: self.metadata,
            organization_id: self.organization_id,
            idempotency_key: self.idempotency_key,
            result: self.result.unwrap_or_default(),
            error: self.error,
            tags: self.tags,
            version: self.version.unwrap_or(1),
        }
    }
}

/// Result of a single `log` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LogOutcome {
    /// Id of the stored event — freshly assigned, or the pre-existing event
    /// when the idempotency key was already taken.
    pub event_id: EventId,
    /// `false` when an existing event with the same idempotency key was
    /// returned instead of writing a new record.
    pub created: bool,
}

/// One page of `list` results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ListPage {
    /// Events in descending `occurred_at` order.
    pub events: Vec<Event>,
    /// Resume cursor: the id of the last event in `events`. `None` when this
    /// is the final page.
    pub next_cursor: Option<EventId>,
    /// Whether more results exist past this page.
    pub has_more: bool,
}

impl ListPage {
    /// The empty page.
    pub fn empty() -> Self {
        Self { events: Vec::new(), next_cursor: None, has_more: false }
    }
}

/// Windowed aggregate counts.
///
/// Exact counts over the scanned window — no sampling. Each frequency map
/// sums to `total_events`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventStats {
    /// Total events in the window.
    pub total_events: u64,
    /// Counts keyed by action string.
    pub events_by_action: BTreeMap<String, u64>,
    /// Counts keyed by actor kind wire name.
    pub events_by_actor_kind: BTreeMap<String, u64>,
    /// Counts keyed by result wire name.
    pub events_by_result: BTreeMap<String, u64>,
}

/// Result of one retention batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RetentionOutcome {
    /// Events deleted in this batch.
    pub deleted: usize,
    /// Whether qualifying events remain; callers re-invoke until `false`.
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn event_id_display_parses_back() {
        let id = EventId::generate();
        let text = id.to_string();
        let back: EventId = text.parse().expect("parse");
        assert_eq!(id, back);
    }

    #[test]
    fn event_id_from_slice_rejects_wrong_length() {
        assert!(EventId::from_slice(&[0u8; 15]).is_none());
        assert!(EventId::from_slice(&[0u8; 17]).is_none());
        assert!(EventId::from_slice(&[7u8; 16]).is_some());
    }

    #[test]
    fn generated_ids_are_unique_and_ordered() {
        let a = EventId::generate();
        let b = EventId::generate();
        assert_ne!(a, b);
        // UUIDv7 leads with a millisecond timestamp
        assert!(a <= b);
    }

    #[test]
    fn draft_defaults_apply() {
        let draft = EventDraft::builder()
            .action("user.signed_in")
            .actor(Actor::new(ActorKind::User, "u1"))
            .build();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let event = draft.into_event(EventId::generate(), now);

        assert_eq!(event.occurred_at, now);
        assert_eq!(event.created_at, now);
        assert_eq!(event.result, EventResult::Success);
        assert_eq!(event.version, 1);
        assert!(event.targets.is_empty());
        assert!(event.organization_id.is_none());
    }

    #[test]
    fn draft_explicit_fields_win() {
        let occurred = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let draft = EventDraft::builder()
            .action("billing.invoice_paid")
            .actor(Actor::new(ActorKind::Service, "billing"))
            .occurred_at(occurred)
            .result(EventResult::Failure)
            .version(3)
            .organization_id("org_1")
            .build();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let event = draft.into_event(EventId::generate(), now);

        assert_eq!(event.occurred_at, occurred);
        assert_eq!(event.created_at, now);
        assert_eq!(event.result, EventResult::Failure);
        assert_eq!(event.version, 3);
        assert_eq!(event.organization_id.as_deref(), Some("org_1"));
    }

    #[test]
    fn occurred_at_ms_clamps_pre_epoch() {
        let draft = EventDraft::builder()
            .action("system.clock_skew")
            .actor(Actor::new(ActorKind::System, "sys"))
            .occurred_at(Utc.timestamp_opt(-1000, 0).unwrap())
            .build();
        let event = draft.into_event(EventId::generate(), Utc::now());
        assert_eq!(event.occurred_at_ms(), 0);
    }

    #[test]
    fn event_postcard_roundtrip() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut metadata = BTreeMap::new();
        metadata.insert("plan".to_string(), "pro".to_string());
        let draft = EventDraft::builder()
            .action("org.plan_changed")
            .actor(Actor::new(ActorKind::ApiKey, "key_9"))
            .targets(vec![Target::new("organization", "org_1")])
            .metadata(metadata)
            .organization_id("org_1")
            .idempotency_key("k1")
            .tags(vec!["billing".to_string()])
            .build();
        let event = draft.into_event(EventId::generate(), now);

        let bytes = crate::encode(&event).expect("encode");
        let back: Event = crate::decode(&bytes).expect("decode");
        assert_eq!(event, back);
    }

    #[test]
    fn event_json_defaults_for_missing_fields() {
        // A minimal JSON event deserializes with documented defaults
        let json = serde_json::json!({
            "id": EventId::generate(),
            "created_at": "2024-01-01T00:00:00Z",
            "occurred_at": "2024-01-01T00:00:00Z",
            "action": "user.signed_in",
            "actor": {"kind": "user", "id": "u1"},
        });
        let event: Event = serde_json::from_value(json).expect("deserialize");
        assert_eq!(event.result, EventResult::Success);
        assert_eq!(event.version, 1);
        assert!(event.tags.is_empty());
    }

    #[test]
    fn actor_kind_wire_names_are_stable() {
        assert_eq!(ActorKind::User.as_str(), "user");
        assert_eq!(ActorKind::System.as_str(), "system");
        assert_eq!(ActorKind::ApiKey.as_str(), "api_key");
        assert_eq!(ActorKind::Service.as_str(), "service");
    }
}
