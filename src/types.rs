//! Shared constants and the severity enum.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::record::ValidationError;

/// Pending-record count that triggers a batch write.
pub const DEFAULT_THRESHOLD: usize = 10;
/// Number of durable records returned by the query surface.
pub const QUERY_LIMIT: usize = 100;

/// Log severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational message.
    #[default]
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

impl Severity {
    /// Wire and storage spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Self::Info),
            "WARN" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            other => Err(ValidationError::InvalidSeverity(other.to_string())),
        }
    }
}
