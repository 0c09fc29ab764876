//! Core domain types for the papertrail audit-event store.
//!
//! This crate provides the foundational types used throughout papertrail:
//! - The [`Event`] record and its component types (actor, target, context)
//! - Input drafts and operation outcome types
//! - Centralized postcard serialization via [`encode`]/[`decode`]
//! - Validated engine configuration
//! - The advisory standard-action name table

#![deny(unsafe_code)]

pub mod actions;
pub mod codec;
pub mod config;
pub mod events;
pub mod validation;

pub use codec::{decode, encode, CodecError};
pub use config::{ConfigError, EngineConfig};
pub use events::{
    Actor, ActorKind, ErrorDetail, Event, EventContext, EventDraft, EventId, EventResult,
    EventStats, ListPage, LogOutcome, RetentionOutcome, Target,
};
pub use validation::{validate_draft, ValidationError};
