//! Report assembly and JSON encoding
//!
//! Range reports are stamped with producer metadata (name, crate version and
//! a per-encoder instance id) so downstream consumers can trace which
//! analyzer instance produced them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bucketing::{SummaryMetrics, TimeBucket};
use crate::config::RangeKind;
use crate::error::ComputeError;
use crate::hourly::{days_with_data, DayHourly, HourlyMetrics};
use crate::weekly::WeeklySummary;
use crate::{HRV_VERSION, PRODUCER_NAME};

/// Identifies the analyzer that produced a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Bucketed metrics over one of the fixed lookback ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeReport {
    pub user_id: String,
    pub range: RangeKind,
    pub timezone: String,
    pub generated_at: DateTime<Utc>,
    pub producer: ReportProducer,
    pub summary_metrics: SummaryMetrics,
    pub time_series: Vec<TimeBucket>,
    /// Only present for ranges longer than one day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<WeeklySummary>,
}

/// Hour-of-day metrics for a single calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub user_id: String,
    pub date: NaiveDate,
    pub hours_available: usize,
    pub hourly: Vec<HourlyMetrics>,
}

impl DayReport {
    pub fn new(user_id: &str, day: DayHourly) -> Self {
        Self {
            user_id: user_id.to_string(),
            date: day.date,
            hours_available: day.hours_available,
            hourly: day.hourly,
        }
    }
}

/// Per-day hourly metrics over an inclusive date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRangeReport {
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: usize,
    pub days_with_data: usize,
    pub days: Vec<DayHourly>,
}

impl DateRangeReport {
    pub fn new(user_id: &str, start_date: NaiveDate, end_date: NaiveDate, days: Vec<DayHourly>) -> Self {
        Self {
            user_id: user_id.to_string(),
            start_date,
            end_date,
            total_days: days.len(),
            days_with_data: days_with_data(&days),
            days,
        }
    }
}

/// Builds range reports carrying this encoder's producer identity
#[derive(Debug, Clone)]
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn producer(&self) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: HRV_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn range_report(
        &self,
        user_id: &str,
        range: RangeKind,
        timezone: &str,
        generated_at: DateTime<Utc>,
        summary_metrics: SummaryMetrics,
        time_series: Vec<TimeBucket>,
        patterns: Option<WeeklySummary>,
    ) -> RangeReport {
        RangeReport {
            user_id: user_id.to_string(),
            range,
            timezone: timezone.to_string(),
            generated_at,
            producer: self.producer(),
            summary_metrics,
            time_series,
            patterns,
        }
    }
}

/// Encode any report as compact JSON
pub fn to_json<T: Serialize>(report: &T) -> Result<String, ComputeError> {
    Ok(serde_json::to_string(report)?)
}

/// Encode any report as indented JSON
pub fn to_json_pretty<T: Serialize>(report: &T) -> Result<String, ComputeError> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricMeans;
    use chrono::TimeZone;

    fn make_report(patterns: Option<WeeklySummary>) -> RangeReport {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        encoder.range_report(
            "user-1",
            RangeKind::SevenDays,
            "America/New_York",
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            SummaryMetrics {
                rmssd_mean: Some(42.0),
                ..Default::default()
            },
            vec![TimeBucket {
                label: "2024-03-14".to_string(),
                metrics: MetricMeans {
                    rmssd: Some(42.0),
                    ..Default::default()
                },
            }],
            patterns,
        )
    }

    #[test]
    fn test_producer_metadata() {
        let encoder = ReportEncoder::new();
        let producer = encoder.producer();
        assert_eq!(producer.name, PRODUCER_NAME);
        assert_eq!(producer.version, HRV_VERSION);
        assert_eq!(producer.instance_id.len(), 36);
        assert_ne!(ReportEncoder::new().instance_id(), encoder.instance_id());
    }

    #[test]
    fn test_range_report_json_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&to_json(&make_report(None)).unwrap()).unwrap();

        assert_eq!(json["range"], "7d");
        assert_eq!(json["producer"]["instance_id"], "test-instance");
        assert_eq!(json["summary_metrics"]["rmssd_mean"], 42.0);
        assert!(json["summary_metrics"]["sdnn_mean"].is_null());
        assert_eq!(json["time_series"][0]["label"], "2024-03-14");
        assert_eq!(json["time_series"][0]["rmssd"], 42.0);
        assert!(json.get("patterns").is_none());
    }

    #[test]
    fn test_patterns_serialized_when_present() {
        let json = to_json_pretty(&make_report(Some(WeeklySummary::default()))).unwrap();
        assert!(json.contains("\"patterns\""));
        assert!(json.contains("\"workweek_difficulty\""));
    }

    #[test]
    fn test_date_range_report_counts() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let days = vec![
            DayHourly::new(
                start,
                vec![HourlyMetrics {
                    hour: 9,
                    metrics: MetricMeans::default(),
                }],
            ),
            DayHourly::empty(end),
        ];

        let report = DateRangeReport::new("user-1", start, end, days);
        assert_eq!(report.total_days, 2);
        assert_eq!(report.days_with_data, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["start_date"], "2024-03-01");
        assert_eq!(json["days"][1]["hours_available"], 0);
    }
}
