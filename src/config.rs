//! Analyzer configuration
//!
//! Holds the display timezone, the analysis window width and the fixed
//! resolution table used by range reports. The configuration is read-only
//! once built and is passed explicitly into each stage that needs it.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ComputeError;

/// Default analysis window width in minutes
pub const DEFAULT_WINDOW_MINUTES: u32 = 15;

/// Maximum number of calendar days a date-range query may span
pub const MAX_RANGE_DAYS: u32 = 366;

/// Default display timezone
pub const DEFAULT_TIMEZONE: Tz = Tz::America__New_York;

/// Reporting range selectable by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeKind {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "6m")]
    SixMonths,
}

impl RangeKind {
    pub const ALL: [RangeKind; 4] = [
        RangeKind::OneDay,
        RangeKind::SevenDays,
        RangeKind::ThirtyDays,
        RangeKind::SixMonths,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeKind::OneDay => "1d",
            RangeKind::SevenDays => "7d",
            RangeKind::ThirtyDays => "30d",
            RangeKind::SixMonths => "6m",
        }
    }
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeKind {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RangeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| ComputeError::UnknownRange(s.to_string()))
    }
}

/// Calendar span of one reporting bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketWidth {
    /// Local clock hour
    Hour,
    /// Local calendar day
    Day,
    /// Local week starting Sunday 00:00
    WeekFromSunday,
    /// Local calendar month starting on the 1st
    MonthStart,
}

/// One row of the resolution table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub range: RangeKind,
    pub lookback_days: u32,
    pub bucket_width: BucketWidth,
    /// strftime-style label pattern
    pub label_format: &'static str,
}

impl Resolution {
    /// Whether reports at this resolution cover more than one calendar day
    pub fn spans_multiple_days(&self) -> bool {
        self.lookback_days > 1
    }
}

/// The fixed four-row resolution table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionTable {
    rows: [Resolution; 4],
}

impl Default for ResolutionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ResolutionTable {
    pub const fn standard() -> Self {
        Self {
            rows: [
                Resolution {
                    range: RangeKind::OneDay,
                    lookback_days: 1,
                    bucket_width: BucketWidth::Hour,
                    label_format: "%Y-%m-%d %H:00",
                },
                Resolution {
                    range: RangeKind::SevenDays,
                    lookback_days: 7,
                    bucket_width: BucketWidth::Day,
                    label_format: "%Y-%m-%d",
                },
                Resolution {
                    range: RangeKind::ThirtyDays,
                    lookback_days: 30,
                    bucket_width: BucketWidth::WeekFromSunday,
                    label_format: "Week of %Y-%m-%d",
                },
                Resolution {
                    range: RangeKind::SixMonths,
                    lookback_days: 180,
                    bucket_width: BucketWidth::MonthStart,
                    label_format: "%Y-%m",
                },
            ],
        }
    }

    pub fn lookup(&self, range: RangeKind) -> &Resolution {
        match range {
            RangeKind::OneDay => &self.rows[0],
            RangeKind::SevenDays => &self.rows[1],
            RangeKind::ThirtyDays => &self.rows[2],
            RangeKind::SixMonths => &self.rows[3],
        }
    }

    pub fn rows(&self) -> &[Resolution] {
        &self.rows
    }
}

/// Main configuration for the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Display timezone; all calendar arithmetic happens in it
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Width of each analysis window in minutes
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,

    /// Cap on the number of days a date-range query may cover
    #[serde(default = "default_max_range_days")]
    pub max_range_days: u32,

    #[serde(skip)]
    pub resolutions: ResolutionTable,
}

fn default_timezone() -> Tz {
    DEFAULT_TIMEZONE
}

fn default_window_minutes() -> u32 {
    DEFAULT_WINDOW_MINUTES
}

fn default_max_range_days() -> u32 {
    MAX_RANGE_DAYS
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            window_minutes: DEFAULT_WINDOW_MINUTES,
            max_range_days: MAX_RANGE_DAYS,
            resolutions: ResolutionTable::standard(),
        }
    }
}

impl AnalyzerConfig {
    /// Default configuration in the given IANA timezone
    pub fn with_timezone(timezone: &str) -> Result<Self, ComputeError> {
        Ok(Self {
            timezone: parse_timezone(timezone)?,
            ..Self::default()
        })
    }

    /// Override the analysis window width
    pub fn window_minutes(mut self, minutes: u32) -> Self {
        self.window_minutes = minutes;
        self
    }

    /// Parse configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ComputeError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.window_minutes == 0 {
            return Err(ComputeError::InvalidConfig(
                "window_minutes must be at least 1".to_string(),
            ));
        }
        if self.max_range_days == 0 {
            return Err(ComputeError::InvalidConfig(
                "max_range_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz, ComputeError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ComputeError::InvalidTimezone(name.to_string()))
}
