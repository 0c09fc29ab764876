//! Error types for the audit-event engine.

use papertrail_types::{CodecError, EventId, ValidationError};
use snafu::Snafu;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors returned by engine operations.
///
/// Deliberately absent: duplicate idempotency keys (reported as
/// `created: false`, never an error) and `get` misses (reported as `None`).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EngineError {
    /// Underlying storage operation failed.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// The underlying store error.
        source: papertrail_store::Error,
        /// Source code location for debugging.
        #[snafu(implicit)]
        location: snafu::Location,
    },

    /// Serialization or deserialization failed.
    #[snafu(display("Codec error: {source}"))]
    Codec {
        /// The codec error.
        source: CodecError,
        /// Source code location for debugging.
        #[snafu(implicit)]
        location: snafu::Location,
    },

    /// Input rejected before reaching storage.
    #[snafu(display("Validation failed: {source}"))]
    Validation {
        /// The violated constraint.
        source: ValidationError,
    },

    /// A privileged operation referenced an event that does not exist.
    #[snafu(display("Event {id} not found"))]
    EventNotFound {
        /// The missing event id.
        id: EventId,
    },

    /// A pagination cursor referenced an event that no longer exists, or one
    /// outside the queried window.
    #[snafu(display("Invalid pagination cursor {id}"))]
    InvalidCursor {
        /// The cursor's event id.
        id: EventId,
    },
}
