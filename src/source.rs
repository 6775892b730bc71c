//! Heart-rate data access
//!
//! Readings arrive as offset-aware timestamps with a bpm value, either from a
//! [`SampleSource`] or parsed from JSON/NDJSON text. They are converted to
//! the display timezone exactly once, in [`ingest`].

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::types::RawSample;

/// A heart-rate reading as stored or transmitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateReading {
    #[serde(alias = "start_time")]
    pub timestamp: DateTime<FixedOffset>,
    #[serde(alias = "value")]
    pub bpm: f64,
}

impl HeartRateReading {
    pub fn new(timestamp: DateTime<FixedOffset>, bpm: f64) -> Self {
        Self { timestamp, bpm }
    }
}

/// Convert readings into samples in the display timezone, keeping order
pub fn ingest(readings: &[HeartRateReading], tz: &Tz) -> Vec<RawSample> {
    readings
        .iter()
        .map(|r| RawSample::new(r.timestamp.with_timezone(tz), r.bpm))
        .collect()
}

/// Provider of per-user heart-rate readings
pub trait SampleSource {
    /// Readings for `user_id` at or after `start`, ascending by timestamp
    fn fetch_heart_rate(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<HeartRateReading>, ComputeError>;
}

/// Sample source backed by in-memory per-user vectors
#[derive(Debug, Clone, Default)]
pub struct InMemorySampleSource {
    readings: HashMap<String, Vec<HeartRateReading>>,
}

impl InMemorySampleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add readings for a user, keeping the stored series sorted
    pub fn insert(&mut self, user_id: &str, readings: impl IntoIterator<Item = HeartRateReading>) {
        let series = self.readings.entry(user_id.to_string()).or_default();
        series.extend(readings);
        series.sort_by_key(|r| r.timestamp);
    }

    pub fn with_readings(
        mut self,
        user_id: &str,
        readings: impl IntoIterator<Item = HeartRateReading>,
    ) -> Self {
        self.insert(user_id, readings);
        self
    }

    /// Number of readings stored for a user
    pub fn len(&self, user_id: &str) -> usize {
        self.readings.get(user_id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.readings.values().all(Vec::is_empty)
    }
}

impl SampleSource for InMemorySampleSource {
    fn fetch_heart_rate(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<HeartRateReading>, ComputeError> {
        Ok(self
            .readings
            .get(user_id)
            .map(|series| {
                series
                    .iter()
                    .filter(|r| r.timestamp >= start)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Parse a JSON array of readings
pub fn parse_readings_json(json: &str) -> Result<Vec<HeartRateReading>, ComputeError> {
    let readings: Vec<HeartRateReading> = serde_json::from_str(json)?;
    Ok(readings)
}

/// Parse newline-delimited JSON readings, skipping blank lines
pub fn parse_readings_ndjson(ndjson: &str) -> Result<Vec<HeartRateReading>, ComputeError> {
    let mut readings = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<HeartRateReading>(trimmed) {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                return Err(ComputeError::ParseError(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(readings)
}

/// Parse either a JSON array or NDJSON, picking by the first character
pub fn parse_readings(input: &str) -> Result<Vec<HeartRateReading>, ComputeError> {
    if input.trim_start().starts_with('[') {
        parse_readings_json(input)
    } else {
        parse_readings_ndjson(input)
    }
}

/// Problems found in a reading; the pipeline tolerates all of them
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("bpm is not a finite number")]
    NonFiniteBpm,

    #[error("bpm must be positive, got {0}")]
    NonPositiveBpm(f64),

    #[error("timestamp is {seconds}s earlier than the previous reading")]
    OutOfOrder { seconds: f64 },
}

/// A validation finding tied to its reading
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingIssue {
    pub index: usize,
    pub timestamp: DateTime<FixedOffset>,
    pub error: ValidationError,
}

/// Report readings with degenerate bpm or decreasing timestamps
pub fn validate_readings(readings: &[HeartRateReading]) -> Vec<ReadingIssue> {
    let mut issues = Vec::new();
    for (index, reading) in readings.iter().enumerate() {
        let issue = |error| ReadingIssue {
            index,
            timestamp: reading.timestamp,
            error,
        };

        if !reading.bpm.is_finite() {
            issues.push(issue(ValidationError::NonFiniteBpm));
        } else if reading.bpm <= 0.0 {
            issues.push(issue(ValidationError::NonPositiveBpm(reading.bpm)));
        }

        if let Some(previous) = index.checked_sub(1).and_then(|i| readings.get(i)) {
            let back = previous.timestamp - reading.timestamp;
            if back > chrono::Duration::zero() {
                issues.push(issue(ValidationError::OutOfOrder {
                    seconds: back.num_milliseconds() as f64 / 1000.0,
                }));
            }
        }
    }
    issues
}
