//! Buffered log ingestion with crash-safe local staging and batched SQLite writes.
//!
//! Accepted records wait in an [`core::buffer::IngestionBuffer`] that is
//! mirrored to a recovery file after every mutation. When the pending count
//! reaches the threshold, the whole buffer goes to the
//! [`persist::DurableStore`] as one batch; a failed batch stays pending and is
//! retried with the next triggering append.
//!
//! # Examples
//!
//! Synchronous usage with an in-memory SQLite store:
//! ```
//! use logbatch::{
//!     core::buffer::{FlushOutcome, IngestionBuffer},
//!     persist::{recovery::RecoveryFile, sqlite::SqliteStore},
//!     record::RawRecord,
//! };
//!
//! let dir = tempfile::tempdir().expect("tempdir");
//! let mut store = SqliteStore::open_in_memory().expect("open sqlite");
//! let mut buffer = IngestionBuffer::restore(RecoveryFile::new(dir.path().join("buffer.json")), 2);
//!
//! let ack = buffer.accept(RawRecord::new("boot", "web-1"), &mut store).expect("accept");
//! assert_eq!(ack.flush, FlushOutcome::NotTriggered);
//! let ack = buffer.accept(RawRecord::new("ready", "web-1"), &mut store).expect("accept");
//! assert_eq!(ack.flush, FlushOutcome::Flushed { count: 2 });
//! assert!(buffer.is_empty());
//! ```
//!
//! Runtime usage:
//! ```no_run
//! use logbatch::{
//!     core::buffer::IngestionBuffer,
//!     persist::{recovery::RecoveryFile, sqlite::SqliteStore},
//!     record::RawRecord,
//!     runtime::handle::{spawn_ingest, RuntimeConfig},
//!     types::DEFAULT_THRESHOLD,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = SqliteStore::open("logbatch.db").expect("open sqlite");
//! let buffer = IngestionBuffer::restore(RecoveryFile::new("buffer.json"), DEFAULT_THRESHOLD);
//! let handle = spawn_ingest(buffer, Box::new(store), RuntimeConfig::default());
//! let _ack = handle
//!     .accept(RawRecord::new("disk 91% full", "db-2").with_severity("WARN"))
//!     .await
//!     .expect("accept");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![warn(missing_docs)]

/// Ingestion buffer and analytics helpers.
pub mod core;
/// HTTP router and handlers.
pub mod http;
/// Durable store abstraction, SQLite implementation, and recovery file.
pub mod persist;
/// Log record and validation.
pub mod record;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Shared constants and enums.
pub mod types;
