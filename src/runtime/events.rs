//! Runtime event stream payloads.

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// A record joined the pending set.
    Accepted {
        /// Pending records after the call.
        pending: usize,
    },
    /// A batch reached the durable store.
    Flushed {
        /// Records written.
        count: usize,
    },
    /// A batch write failed; the records stay pending.
    FlushDeferred {
        /// Records still pending.
        pending: usize,
        /// Store error text.
        reason: String,
    },
    /// The recovery file no longer mirrors the buffer.
    RecoveryWriteFailed {
        /// Records at risk on crash.
        pending: usize,
    },
}
