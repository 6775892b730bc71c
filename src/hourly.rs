//! Hour-of-day aggregation
//!
//! Groups the feature records of one calendar day by local clock hour.
//! Multi-day callers run this per day so hours never blend across dates.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::local_hour;
use crate::stats::MetricAccumulator;
use crate::types::{FeatureRecord, MetricMeans};

/// Tracked metric means for one hour of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyMetrics {
    /// Local hour, 0–23
    pub hour: u32,
    #[serde(flatten)]
    pub metrics: MetricMeans,
}

/// Hourly breakdown of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayHourly {
    pub date: NaiveDate,
    pub hours_available: usize,
    pub hourly: Vec<HourlyMetrics>,
}

impl DayHourly {
    pub fn new(date: NaiveDate, hourly: Vec<HourlyMetrics>) -> Self {
        Self {
            date,
            hours_available: hourly.len(),
            hourly,
        }
    }

    /// A day without any populated hour
    pub fn empty(date: NaiveDate) -> Self {
        Self::new(date, Vec::new())
    }

    pub fn has_data(&self) -> bool {
        self.hours_available > 0
    }
}

/// Mean of each tracked metric per local hour, ascending by hour.
///
/// Hours without a contributing record are left out.
pub fn hourly_means(records: &[FeatureRecord]) -> Vec<HourlyMetrics> {
    let mut hours: BTreeMap<u32, MetricAccumulator> = BTreeMap::new();
    for record in records {
        hours
            .entry(local_hour(&record.timestamp))
            .or_default()
            .push(&record.features);
    }

    hours
        .into_iter()
        .filter(|(_, acc)| !acc.is_empty())
        .map(|(hour, acc)| HourlyMetrics {
            hour,
            metrics: acc.means(),
        })
        .collect()
}

/// Number of days with at least one populated hour
pub fn days_with_data(days: &[DayHourly]) -> usize {
    days.iter().filter(|day| day.has_data()).count()
}
