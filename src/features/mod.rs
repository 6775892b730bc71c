//! HRV feature computation
//!
//! Per-window metrics are produced by an [`HrvFeatureComputer`]. The
//! [`StandardFeatureComputer`] cleans the interval series and then computes
//! three metric groups:
//! - Time domain (at least 2 intervals)
//! - Frequency domain via Lomb-Scargle (at least 10 intervals)
//! - Poincaré descriptors (at least 10 intervals)

pub mod cleaning;
pub mod frequency;
pub mod nonlinear;
pub mod time_domain;

use tracing::warn;

use crate::error::ComputeError;
use crate::types::{FeatureExtraction, FeatureRecord, HrvFeatures, Window};

/// Computes HRV metrics for one window of IBI values (ms)
pub trait HrvFeatureComputer: Send + Sync {
    fn compute(&self, ibi_values: &[f64]) -> Result<FeatureExtraction, ComputeError>;
}

/// Default feature computer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardFeatureComputer {
    /// Drop intervals outside 300–2000 ms before ectopic removal
    pub remove_outliers: bool,
}

impl Default for StandardFeatureComputer {
    fn default() -> Self {
        Self {
            remove_outliers: true,
        }
    }
}

impl StandardFeatureComputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outlier_removal(mut self, enabled: bool) -> Self {
        self.remove_outliers = enabled;
        self
    }
}

impl HrvFeatureComputer for StandardFeatureComputer {
    fn compute(&self, ibi_values: &[f64]) -> Result<FeatureExtraction, ComputeError> {
        let cleaned = cleaning::clean_intervals(ibi_values, self.remove_outliers);
        let nn = &cleaned.intervals;

        let mut features = HrvFeatures::default();
        time_domain::compute(nn, &mut features);
        frequency::compute(nn, &mut features);
        nonlinear::compute(nn, &mut features);

        Ok(FeatureExtraction {
            features: features.sanitized(),
            num_rr_intervals: nn.len(),
            num_removed: cleaned.removed,
        })
    }
}

/// Run the computer over every window, keyed by window start.
///
/// A failing window degrades to an all-null record instead of aborting
/// the whole batch.
pub fn extract_feature_records(
    windows: &[Window],
    computer: &dyn HrvFeatureComputer,
) -> Vec<FeatureRecord> {
    windows
        .iter()
        .map(|window| {
            let extraction = computer.compute(&window.ibi_values).unwrap_or_else(|err| {
                warn!(
                    window_start = %window.window_start,
                    error = %err,
                    "feature computation failed, emitting empty record"
                );
                FeatureExtraction::empty(window.ibi_values.len())
            });
            FeatureRecord {
                timestamp: window.window_start,
                features: extraction.features.sanitized(),
                num_rr_intervals: extraction.num_rr_intervals,
                num_removed: extraction.num_removed,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    struct FailingComputer;

    impl HrvFeatureComputer for FailingComputer {
        fn compute(&self, _ibi_values: &[f64]) -> Result<FeatureExtraction, ComputeError> {
            Err(ComputeError::FeatureError("singular input".to_string()))
        }
    }

    fn make_varied(count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| 800.0 + [0.0, 25.0, -15.0, 40.0, -30.0][i % 5])
            .collect()
    }

    fn make_window(ibi_values: Vec<f64>) -> Window {
        Window {
            window_start: New_York.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            bpm_mean: Some(75.0),
            ibi_values,
        }
    }

    #[test]
    fn test_nine_intervals_time_domain_only() {
        let result = StandardFeatureComputer::new().compute(&make_varied(9)).unwrap();
        assert_eq!(result.num_rr_intervals, 9);
        assert!(result.features.has_time_domain());
        assert!(!result.features.has_frequency_domain());
        assert!(!result.features.has_nonlinear());
    }

    #[test]
    fn test_ten_intervals_all_groups() {
        let result = StandardFeatureComputer::new().compute(&make_varied(10)).unwrap();
        assert_eq!(result.num_rr_intervals, 10);
        assert_eq!(result.num_removed, 0);
        assert!(result.features.has_time_domain());
        assert!(result.features.has_frequency_domain());
        assert!(result.features.has_nonlinear());
    }

    #[test]
    fn test_single_interval_is_all_null() {
        let result = StandardFeatureComputer::new().compute(&[800.0]).unwrap();
        assert_eq!(result.features, HrvFeatures::default());
        assert_eq!(result.num_rr_intervals, 1);
    }

    #[test]
    fn test_failing_computer_degrades_to_empty_record() {
        let windows = vec![make_window(make_varied(12))];
        let records = extract_feature_records(&windows, &FailingComputer);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].features, HrvFeatures::default());
        assert_eq!(records[0].num_rr_intervals, 12);
        assert_eq!(records[0].timestamp, windows[0].window_start);
    }

    #[test]
    fn test_records_follow_window_order() {
        let mut later = make_window(make_varied(5));
        later.window_start = later.window_start + chrono::Duration::minutes(15);
        let windows = vec![make_window(make_varied(5)), later];

        let records = extract_feature_records(&windows, &StandardFeatureComputer::new());
        assert_eq!(records.len(), 2);
        assert!(records[0].timestamp < records[1].timestamp);
        assert!(records.iter().all(|r| r.features.rmssd.is_some()));
    }
}
