//! Error types for the papertrail storage engine.

use std::io;

use snafu::Snafu;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during store operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// I/O error from the underlying storage backend.
    #[snafu(display("I/O error: {source}"))]
    Io {
        /// The underlying I/O error.
        source: io::Error,
    },

    /// Snapshot file is corrupted or has invalid format.
    #[snafu(display("Corrupted database: {reason}"))]
    Corrupted {
        /// Description of what was corrupted.
        reason: String,
    },

    /// Invalid magic number in the snapshot header.
    #[snafu(display("Invalid database magic number"))]
    InvalidMagic,

    /// Unsupported snapshot format version.
    #[snafu(display("Unsupported format version: {version}"))]
    UnsupportedVersion {
        /// The unsupported version number.
        version: u16,
    },

    /// Snapshot body checksum verification failed.
    #[snafu(display("Snapshot checksum mismatch: expected {expected:#018x}, got {actual:#018x}"))]
    ChecksumMismatch {
        /// Checksum recorded in the header.
        expected: u64,
        /// Checksum computed over the body.
        actual: u64,
    },

    /// Snapshot body serialization failed.
    #[snafu(display("Snapshot codec error: {source}"))]
    Codec {
        /// The underlying postcard error.
        source: postcard::Error,
    },
}
