//! Crate error type.
//!
//! Parse-level failures surface here and propagate to whoever invoked the
//! load or merge. Registry duplicates and unhandled suites are not errors.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed JSON in {path} line {line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid event record at line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    #[error("trace capture has no BEGIN TRACE / END TRACE span")]
    TraceMarkersMissing,

    #[error("unparseable systrace line {line:?}: {reason}")]
    TraceLine { line: String, reason: String },

    #[error("unable to synchronize clocks: no clock sync marker in trace capture")]
    ClockSyncMissing,

    #[error(transparent)]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid device: {0}")]
    InvalidDevice(String),

    #[error("malformed device fleet listing: {0}")]
    FleetListing(#[source] serde_json::Error),

    #[error("invalid pipeline config: {0}")]
    Config(#[source] serde_json::Error),
}

impl ReportError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::Json { .. } => "JSON_ERROR",
            Self::InvalidRecord { .. } => "INVALID_RECORD",
            Self::TraceMarkersMissing => "TRACE_MARKERS_MISSING",
            Self::TraceLine { .. } => "TRACE_LINE_INVALID",
            Self::ClockSyncMissing => "CLOCK_SYNC_MISSING",
            Self::InvalidPattern(_) => "INVALID_PATTERN",
            Self::InvalidDevice(_) => "INVALID_DEVICE",
            Self::FleetListing(_) => "FLEET_LISTING_INVALID",
            Self::Config(_) => "CONFIG_INVALID",
        }
    }

    /// True for conditions the caller may recover from by skipping the
    /// merge and keeping the original report.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ClockSyncMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ReportError::ClockSyncMissing.code(), "CLOCK_SYNC_MISSING");
        assert_eq!(
            ReportError::InvalidDevice("x".to_string()).code(),
            "INVALID_DEVICE"
        );
    }

    #[test]
    fn test_only_clock_sync_is_recoverable() {
        assert!(ReportError::ClockSyncMissing.is_recoverable());
        assert!(!ReportError::TraceMarkersMissing.is_recoverable());
    }

    #[test]
    fn test_clock_sync_message() {
        let msg = ReportError::ClockSyncMissing.to_string();
        assert!(msg.starts_with("unable to synchronize clocks"));
    }
}
