//! Append-oriented, multi-tenant audit-event engine.
//!
//! Events are immutable records of "who did what, to what, when, with what
//! outcome". The engine provides idempotent writes, index-driven listing with
//! cursor pagination, token-prefix search over action names, windowed stats,
//! batched retention pruning, and a narrow privileged patch for annotations.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  AuditLog (audit.rs)                │
//! │   one transaction per operation, commit-on-return   │
//! ├──────────┬─────────┬─────────┬──────────┬───────────┤
//! │ write.rs │ read.rs │search.rs│ stats.rs │retention.rs│
//! ├──────────┴─────────┴─────────┴──────────┴───────────┤
//! │         EventStore + keys (event_store.rs)          │
//! │     primary table + 6 index tables, maintained      │
//! │               together on every write               │
//! ├─────────────────────────────────────────────────────┤
//! │              papertrail-store (Database)            │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use papertrail_engine::{AuditLog, ListQuery};
//! use papertrail_types::{Actor, ActorKind, EventDraft};
//!
//! # fn main() -> papertrail_engine::Result<()> {
//! let log = AuditLog::open_in_memory()?;
//!
//! let outcome = log.log(
//!     EventDraft::builder()
//!         .action("user.signed_in")
//!         .actor(Actor::new(ActorKind::User, "user_1"))
//!         .organization_id("org_1")
//!         .build(),
//! )?;
//! assert!(outcome.created);
//!
//! let page = log.list(&ListQuery::builder().organization_id("org_1").build())?;
//! assert_eq!(page.events.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod error;
pub mod event_store;
pub mod keys;
pub mod read;
pub mod retention;
pub mod search;
pub mod stats;
pub mod update;
pub mod write;

pub use audit::AuditLog;
pub use error::{EngineError, Result};
pub use read::{ActionQuery, ActorQuery, ListQuery};
pub use retention::RetentionRequest;
pub use search::SearchQuery;
pub use stats::StatsQuery;
pub use update::EventPatch;
