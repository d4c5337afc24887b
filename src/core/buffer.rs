use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::{
    persist::{DurableStore, StoreError, recovery::RecoveryFile},
    record::{LogRecord, RawRecord, ValidationError},
};

/// What happened to the batch write on a given accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Pending count stayed below the threshold.
    NotTriggered,
    /// The store acknowledged the batch and the buffer was cleared.
    Flushed {
        /// Records written.
        count: usize,
    },
    /// The store rejected the batch; every record is still pending.
    Deferred {
        /// Store error text.
        reason: String,
    },
}

/// Acknowledgment returned for an accepted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Pending records after this call resolved.
    pub pending: usize,
    /// Batch write outcome for this call.
    pub flush: FlushOutcome,
    /// False when the recovery file could not be rewritten.
    pub recovery_persisted: bool,
}

/// Result of an operator flush.
#[derive(Debug)]
pub struct FlushReport {
    /// Records written, or the store error that kept them pending.
    pub written: Result<usize, StoreError>,
    /// False when the recovery file could not be rewritten.
    pub recovery_persisted: bool,
}

/// Ordered accumulator of records not yet confirmed durable.
///
/// Every mutation is followed by exactly one rewrite of the recovery file, so
/// the file mirrors [`IngestionBuffer::pending`] whenever a call returns.
#[derive(Debug)]
pub struct IngestionBuffer {
    records: Vec<LogRecord>,
    threshold: usize,
    recovery: RecoveryFile,
}

impl IngestionBuffer {
    /// Empty buffer; does not read or write `recovery`.
    pub fn new(recovery: RecoveryFile, threshold: usize) -> Self {
        Self {
            records: Vec::new(),
            threshold: threshold.max(1),
            recovery,
        }
    }

    /// Seeds the buffer from the recovery file.
    ///
    /// A missing or unreadable file yields an empty buffer. Restored records
    /// are not flushed here; they wait for the next threshold crossing.
    pub fn restore(recovery: RecoveryFile, threshold: usize) -> Self {
        let mut buffer = Self::new(recovery, threshold);
        match buffer.recovery.try_load() {
            Ok(Some(records)) => {
                info!(
                    path = %buffer.recovery.path().display(),
                    count = records.len(),
                    "Buffer restored from disk"
                );
                buffer.records = records;
            }
            Ok(None) => {
                debug!(path = %buffer.recovery.path().display(), "No recovery file");
            }
            Err(err) => {
                warn!(
                    path = %buffer.recovery.path().display(),
                    error = %err,
                    "Failed to read recovery file, starting empty"
                );
            }
        }
        buffer
    }

    /// Validates and appends `raw`, flushing when the threshold is reached.
    pub fn accept(
        &mut self,
        raw: RawRecord,
        store: &mut dyn DurableStore,
    ) -> Result<Ack, ValidationError> {
        self.accept_at(raw, Utc::now(), store)
    }

    /// [`IngestionBuffer::accept`] with an explicit acceptance time.
    pub fn accept_at(
        &mut self,
        raw: RawRecord,
        now: DateTime<Utc>,
        store: &mut dyn DurableStore,
    ) -> Result<Ack, ValidationError> {
        let record = LogRecord::from_raw(raw, now)?;
        self.records.push(record);

        let flush = if self.records.len() >= self.threshold {
            match self.write_pending(store) {
                Ok(count) => FlushOutcome::Flushed { count },
                Err(err) => FlushOutcome::Deferred {
                    reason: err.to_string(),
                },
            }
        } else {
            FlushOutcome::NotTriggered
        };

        let recovery_persisted = self.persist();
        Ok(Ack {
            pending: self.records.len(),
            flush,
            recovery_persisted,
        })
    }

    /// Writes every pending record as one batch, regardless of threshold.
    ///
    /// An empty buffer writes zero records and makes no store call and no
    /// disk write.
    pub fn flush_pending(&mut self, store: &mut dyn DurableStore) -> FlushReport {
        if self.records.is_empty() {
            return FlushReport {
                written: Ok(0),
                recovery_persisted: true,
            };
        }
        let written = self.write_pending(store);
        let recovery_persisted = self.persist();
        FlushReport {
            written,
            recovery_persisted,
        }
    }

    /// Records accepted but not yet durable, in arrival order.
    pub fn pending(&self) -> &[LogRecord] {
        &self.records
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pending count that triggers a flush.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Recovery file this buffer mirrors to.
    pub fn recovery_file(&self) -> &RecoveryFile {
        &self.recovery
    }

    fn write_pending(&mut self, store: &mut dyn DurableStore) -> Result<usize, StoreError> {
        let count = self.records.len();
        match store.write_batch(&self.records) {
            Ok(()) => {
                info!(count, "Batch written");
                self.records.clear();
                Ok(count)
            }
            Err(err) => {
                error!(count, error = %err, "Batch insert failed, records remain pending");
                Err(err)
            }
        }
    }

    fn persist(&self) -> bool {
        match self.recovery.write(&self.records) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    path = %self.recovery.path().display(),
                    pending = self.records.len(),
                    error = %err,
                    "Failed to persist buffer to disk; crash recovery is degraded"
                );
                false
            }
        }
    }
}
