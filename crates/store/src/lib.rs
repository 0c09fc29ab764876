//! papertrail-store: a purpose-built embedded table store for papertrail.
//!
//! A deliberately small storage engine shaped by the audit-event workload:
//!
//! - **Fixed schema**: 7 tables known at compile time
//! - **Ordered tables**: big-endian composite keys give chronological range
//!   scans in both directions
//! - **Single writer**: one write transaction at a time; readers see a
//!   consistent snapshot for the lifetime of their transaction
//! - **Atomic commit**: buffered write sets apply all-or-nothing; the file
//!   backend persists a checksummed snapshot via atomic rename
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Database API                  │
//! │        (open, read, write, commit)          │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │             Transaction Layer                │
//! │ (ReadTxn: shared guard, WriteTxn: overlay)  │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │             Ordered Table Layer              │
//! │        (get, insert, delete, range)         │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │            Storage Backend                   │
//! │      (FileBackend / InMemoryBackend)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use papertrail_store::{Database, Table, TableId};
//!
//! struct Events;
//! impl Table for Events {
//!     const ID: TableId = TableId::Events;
//! }
//!
//! let db = Database::open_in_memory()?;
//!
//! let mut txn = db.write()?;
//! txn.insert::<Events>(b"key", b"value")?;
//! txn.commit()?;
//!
//! let txn = db.read()?;
//! let value = txn.get::<Events>(b"key")?;
//! assert_eq!(value.as_deref(), Some(&b"value"[..]));
//! # Ok::<(), papertrail_store::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod db;
pub mod error;
pub mod tables;

pub use backend::{FileBackend, InMemoryBackend, StorageBackend, MAGIC};
pub use db::{Database, MergedRange, ReadTransaction, SharedDatabase, TableIterator, WriteTransaction};
pub use error::{Error, Result};
pub use tables::{Table, TableId, TableSet};

/// Store format version.
pub const VERSION: u16 = 1;
