//! Range bucketization
//!
//! Feature records are grouped into calendar buckets of the selected
//! resolution (hour, day, Sunday-anchored week or month) computed in the
//! display timezone. Range summaries are a separate second stage: the mean
//! of the per-bucket means.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::calendar::{bucket_start, format_label};
use crate::config::Resolution;
use crate::stats::{finite_mean, MetricAccumulator};
use crate::types::{FeatureRecord, Metric, MetricMeans};

/// One labelled point of a range time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub label: String,
    #[serde(flatten)]
    pub metrics: MetricMeans,
}

/// Range-level means of the bucket means
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub rmssd_mean: Option<f64>,
    pub sdnn_mean: Option<f64>,
    pub mean_hr: Option<f64>,
    pub lf_hf_ratio_mean: Option<f64>,
}

impl SummaryMetrics {
    pub fn is_empty(&self) -> bool {
        self.rmssd_mean.is_none()
            && self.sdnn_mean.is_none()
            && self.mean_hr.is_none()
            && self.lf_hf_ratio_mean.is_none()
    }
}

/// Assign records to buckets and average each tracked metric.
///
/// Buckets are keyed by their local wall-clock start and returned in
/// ascending order; a bucket that no record contributes to is omitted.
pub fn bucketize(records: &[FeatureRecord], resolution: &Resolution) -> Vec<TimeBucket> {
    let mut buckets: BTreeMap<NaiveDateTime, MetricAccumulator> = BTreeMap::new();

    for record in records {
        let start = bucket_start(&record.timestamp, resolution.bucket_width);
        buckets.entry(start).or_default().push(&record.features);
    }

    buckets
        .into_iter()
        .filter(|(_, acc)| !acc.is_empty())
        .map(|(start, acc)| TimeBucket {
            label: format_label(&start, resolution.label_format),
            metrics: acc.means(),
        })
        .collect()
}

/// Second-stage mean: average each metric over the buckets that carry it
pub fn summarize_buckets(buckets: &[TimeBucket]) -> SummaryMetrics {
    let column = |metric: Metric| finite_mean(buckets.iter().filter_map(|b| b.metrics.get(metric)));

    SummaryMetrics {
        rmssd_mean: column(Metric::Rmssd),
        sdnn_mean: column(Metric::Sdnn),
        mean_hr: column(Metric::MeanHr),
        lf_hf_ratio_mean: column(Metric::LfHfRatio),
    }
}
