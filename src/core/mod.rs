//! Ingestion buffer and read-side helpers.

/// Per-server counts over durable records.
pub mod analytics;
/// Pending-record buffer and flush protocol.
pub mod buffer;
