//! Error types for Synheart HRV

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse heart rate input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    DateParseError(String),

    #[error("Unknown range '{0}'. Expected one of 1d, 7d, 30d, 6m.")]
    UnknownRange(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Feature computation error: {0}")]
    FeatureError(String),

    #[error("No data: {0}")]
    NoData(String),
}

impl ComputeError {
    /// Whether the error represents an empty result rather than a failure
    pub fn is_no_data(&self) -> bool {
        matches!(self, ComputeError::NoData(_))
    }
}
