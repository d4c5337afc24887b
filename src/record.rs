//! Log record, raw ingest payload, and field validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Severity;

/// Reason an ingest payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `content` absent or blank.
    #[error("content is required and must not be empty")]
    MissingContent,
    /// `server` absent or blank.
    #[error("server is required and must not be empty")]
    MissingServer,
    /// `severity` present but not INFO, WARN or ERROR.
    #[error("severity must be one of INFO, WARN, ERROR (got {0:?})")]
    InvalidSeverity(String),
}

/// Unvalidated ingest payload as received from a producer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Log line text.
    pub content: Option<String>,
    /// Originating server name.
    pub server: Option<String>,
    /// Optional severity spelling.
    pub severity: Option<String>,
}

impl RawRecord {
    /// Payload with content and server set and no severity.
    pub fn new(content: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            server: Some(server.into()),
            severity: None,
        }
    }

    /// Sets the severity spelling.
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }
}

/// Accepted, immutable log record.
///
/// Deserializing runs the same content and server checks as
/// [`LogRecord::from_raw`], so a record read back from disk is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct LogRecord {
    content: String,
    server: String,
    severity: Severity,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StoredRecord {
    content: String,
    server: String,
    // Buffers written before severity existed carry no level.
    #[serde(default)]
    severity: Severity,
    timestamp: DateTime<Utc>,
}

impl TryFrom<StoredRecord> for LogRecord {
    type Error = ValidationError;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        Self::new(stored.content, stored.server, stored.severity, stored.timestamp)
    }
}

impl LogRecord {
    /// Validates `raw` and stamps it with `timestamp`.
    pub fn from_raw(raw: RawRecord, timestamp: DateTime<Utc>) -> Result<Self, ValidationError> {
        let content = raw
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(ValidationError::MissingContent)?;
        let server = raw
            .server
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::MissingServer)?;
        let severity = match raw.severity {
            Some(s) => s.parse()?,
            None => Severity::default(),
        };

        Ok(Self {
            content,
            server,
            severity,
            timestamp,
        })
    }

    /// Builds a record from already-typed parts, applying the same field checks.
    pub fn new(
        content: impl Into<String>,
        server: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let mut rec = Self::from_raw(RawRecord::new(content, server), timestamp)?;
        rec.severity = severity;
        Ok(rec)
    }

    /// Log line text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Originating server name.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Severity level.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Acceptance time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
