pub mod recovery;
pub mod sqlite;

use std::time::Duration;

use crate::record::LogRecord;

/// Failure of a durable-store call. The whole batch is considered unwritten.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend error from SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),
    /// Failure reported by a non-SQLite [`DurableStore`] implementation.
    #[error("{0}")]
    Message(String),
}

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Backing store that receives flushed batches and serves recent records.
pub trait DurableStore: Send {
    /// Persists `records` as one all-or-nothing batch.
    fn write_batch(&mut self, records: &[LogRecord]) -> StoreResult<()>;

    /// Returns at most `limit` durable records, newest first.
    fn recent(&self, limit: usize) -> StoreResult<Vec<LogRecord>>;

    /// Bounds how long a single call may wait on the backend.
    fn set_timeout(&mut self, _timeout: Duration) -> StoreResult<()> {
        Ok(())
    }
}
