//! Core types for the Synheart HRV pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw heart-rate samples, inter-beat intervals, analysis windows and
//! per-window feature records.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::stats::finite;

/// A single heart-rate reading in the display timezone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSample {
    pub timestamp: DateTime<Tz>,
    /// Beats per minute; zero or implausible values are tolerated here
    pub bpm: f64,
}

impl RawSample {
    pub fn new(timestamp: DateTime<Tz>, bpm: f64) -> Self {
        Self { timestamp, bpm }
    }
}

/// Inter-beat interval derived from one raw sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IbiSample {
    pub timestamp: DateTime<Tz>,
    /// Source heart rate (bpm), carried for per-window averaging
    pub bpm: f64,
    /// 60000 / bpm; infinite when bpm is zero
    pub ibi_ms: f64,
    /// Seconds since the previous sample; `None` for the first sample
    pub delta_sec: Option<f64>,
}

/// Fixed-width analysis window ready for feature computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub window_start: DateTime<Tz>,
    /// Mean of the per-minute bpm means inside the window
    pub bpm_mean: Option<f64>,
    /// Per-minute IBI means (ms), missing minutes removed
    pub ibi_values: Vec<f64>,
}

/// HRV metrics for one window.
///
/// Every known metric is enumerated; a metric the computation could not
/// produce is `None` rather than absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HrvFeatures {
    // Time domain
    pub mean_nni: Option<f64>,
    pub sdnn: Option<f64>,
    pub sdsd: Option<f64>,
    pub rmssd: Option<f64>,
    pub median_nni: Option<f64>,
    pub nni_50: Option<f64>,
    pub pnni_50: Option<f64>,
    pub nni_20: Option<f64>,
    pub pnni_20: Option<f64>,
    pub range_nni: Option<f64>,
    pub cvsd: Option<f64>,
    pub cvnni: Option<f64>,
    pub mean_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub min_hr: Option<f64>,
    pub std_hr: Option<f64>,

    // Frequency domain
    pub lf: Option<f64>,
    pub hf: Option<f64>,
    pub lf_hf_ratio: Option<f64>,
    pub lfnu: Option<f64>,
    pub hfnu: Option<f64>,
    pub total_power: Option<f64>,
    pub vlf: Option<f64>,

    // Non-linear (Poincaré)
    pub sd1: Option<f64>,
    pub sd2: Option<f64>,
    pub ratio_sd2_sd1: Option<f64>,
}

impl HrvFeatures {
    /// Replace every non-finite value with `None`
    pub fn sanitized(self) -> Self {
        let clean = |v: Option<f64>| v.and_then(finite);
        Self {
            mean_nni: clean(self.mean_nni),
            sdnn: clean(self.sdnn),
            sdsd: clean(self.sdsd),
            rmssd: clean(self.rmssd),
            median_nni: clean(self.median_nni),
            nni_50: clean(self.nni_50),
            pnni_50: clean(self.pnni_50),
            nni_20: clean(self.nni_20),
            pnni_20: clean(self.pnni_20),
            range_nni: clean(self.range_nni),
            cvsd: clean(self.cvsd),
            cvnni: clean(self.cvnni),
            mean_hr: clean(self.mean_hr),
            max_hr: clean(self.max_hr),
            min_hr: clean(self.min_hr),
            std_hr: clean(self.std_hr),
            lf: clean(self.lf),
            hf: clean(self.hf),
            lf_hf_ratio: clean(self.lf_hf_ratio),
            lfnu: clean(self.lfnu),
            hfnu: clean(self.hfnu),
            total_power: clean(self.total_power),
            vlf: clean(self.vlf),
            sd1: clean(self.sd1),
            sd2: clean(self.sd2),
            ratio_sd2_sd1: clean(self.ratio_sd2_sd1),
        }
    }

    /// Whether any time-domain metric is present
    pub fn has_time_domain(&self) -> bool {
        self.rmssd.is_some() || self.sdnn.is_some() || self.mean_nni.is_some()
    }

    /// Whether any frequency-domain metric is present
    pub fn has_frequency_domain(&self) -> bool {
        self.lf.is_some() || self.hf.is_some() || self.lf_hf_ratio.is_some()
    }

    /// Whether any non-linear metric is present
    pub fn has_nonlinear(&self) -> bool {
        self.sd1.is_some() || self.sd2.is_some()
    }
}

/// Output of one feature computation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureExtraction {
    pub features: HrvFeatures,
    /// Intervals left after cleaning
    pub num_rr_intervals: usize,
    /// Intervals dropped by cleaning
    pub num_removed: usize,
}

impl FeatureExtraction {
    /// The all-null result used when computation fails
    pub fn empty(num_rr_intervals: usize) -> Self {
        Self {
            features: HrvFeatures::default(),
            num_rr_intervals,
            num_removed: 0,
        }
    }
}

/// Per-window HRV record, keyed by the window start
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub timestamp: DateTime<Tz>,
    #[serde(flatten)]
    pub features: HrvFeatures,
    pub num_rr_intervals: usize,
    pub num_removed: usize,
}

/// The four metrics carried into every report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Rmssd,
    Sdnn,
    MeanHr,
    LfHfRatio,
}

impl Metric {
    pub const TRACKED: [Metric; 4] = [
        Metric::Rmssd,
        Metric::Sdnn,
        Metric::MeanHr,
        Metric::LfHfRatio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Rmssd => "rmssd",
            Metric::Sdnn => "sdnn",
            Metric::MeanHr => "mean_hr",
            Metric::LfHfRatio => "lf_hf_ratio",
        }
    }

    /// Finite value of this metric in a feature set
    pub fn value(&self, features: &HrvFeatures) -> Option<f64> {
        let raw = match self {
            Metric::Rmssd => features.rmssd,
            Metric::Sdnn => features.sdnn,
            Metric::MeanHr => features.mean_hr,
            Metric::LfHfRatio => features.lf_hf_ratio,
        };
        raw.and_then(finite)
    }
}

/// Mean of each tracked metric over a group of records
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricMeans {
    pub rmssd: Option<f64>,
    pub sdnn: Option<f64>,
    pub mean_hr: Option<f64>,
    pub lf_hf_ratio: Option<f64>,
}

impl MetricMeans {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Rmssd => self.rmssd,
            Metric::Sdnn => self.sdnn,
            Metric::MeanHr => self.mean_hr,
            Metric::LfHfRatio => self.lf_hf_ratio,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Rmssd => &mut self.rmssd,
            Metric::Sdnn => &mut self.sdnn,
            Metric::MeanHr => &mut self.mean_hr,
            Metric::LfHfRatio => &mut self.lf_hf_ratio,
        };
        *slot = value.and_then(finite);
    }

    pub fn is_empty(&self) -> bool {
        Metric::TRACKED.iter().all(|m| self.get(*m).is_none())
    }
}
