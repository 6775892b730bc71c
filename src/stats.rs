//! Finite-only statistics
//!
//! Every aggregate in the crate treats NaN and infinities as missing, so
//! degenerate inputs such as a zero-bpm sample never reach a report.

use statrs::statistics::{Data, Median, Statistics};

use crate::types::{HrvFeatures, Metric, MetricMeans};

/// `Some(value)` when the value is finite
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Mean of the finite values, `None` when there are none
pub fn finite_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let kept: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if kept.is_empty() {
        return None;
    }
    finite(kept.iter().mean())
}

/// Sample standard deviation (n - 1) of the finite values
pub fn finite_std<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let kept: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if kept.len() < 2 {
        return None;
    }
    finite(kept.iter().std_dev())
}

/// Minimum of the finite values
pub fn finite_min(values: &[f64]) -> Option<f64> {
    let kept: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if kept.is_empty() {
        return None;
    }
    finite(Statistics::min(kept.iter()))
}

/// Maximum of the finite values
pub fn finite_max(values: &[f64]) -> Option<f64> {
    let kept: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if kept.is_empty() {
        return None;
    }
    finite(Statistics::max(kept.iter()))
}

/// Median of the finite values
pub fn finite_median(values: &[f64]) -> Option<f64> {
    let kept: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if kept.is_empty() {
        return None;
    }
    finite(Data::new(kept).median())
}

/// Collects the finite values of the tracked metrics for one group
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    rmssd: Vec<f64>,
    sdnn: Vec<f64>,
    mean_hr: Vec<f64>,
    lf_hf_ratio: Vec<f64>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record's metrics; returns whether any metric contributed
    pub fn push(&mut self, features: &HrvFeatures) -> bool {
        let mut contributed = false;
        for metric in Metric::TRACKED {
            if let Some(value) = metric.value(features) {
                self.slot_mut(metric).push(value);
                contributed = true;
            }
        }
        contributed
    }

    /// Add a single value for one metric (ignored when non-finite)
    pub fn push_value(&mut self, metric: Metric, value: Option<f64>) {
        if let Some(v) = value.and_then(finite) {
            self.slot_mut(metric).push(v);
        }
    }

    pub fn values(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Rmssd => &self.rmssd,
            Metric::Sdnn => &self.sdnn,
            Metric::MeanHr => &self.mean_hr,
            Metric::LfHfRatio => &self.lf_hf_ratio,
        }
    }

    /// True when no metric received a value
    pub fn is_empty(&self) -> bool {
        Metric::TRACKED
            .iter()
            .all(|metric| self.values(*metric).is_empty())
    }

    pub fn mean(&self, metric: Metric) -> Option<f64> {
        finite_mean(self.values(metric).iter().copied())
    }

    pub fn std(&self, metric: Metric) -> Option<f64> {
        finite_std(self.values(metric).iter().copied())
    }

    pub fn means(&self) -> MetricMeans {
        let mut means = MetricMeans::default();
        for metric in Metric::TRACKED {
            means.set(metric, self.mean(metric));
        }
        means
    }

    fn slot_mut(&mut self, metric: Metric) -> &mut Vec<f64> {
        match metric {
            Metric::Rmssd => &mut self.rmssd,
            Metric::Sdnn => &mut self.sdnn,
            Metric::MeanHr => &mut self.mean_hr,
            Metric::LfHfRatio => &mut self.lf_hf_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_mean_skips_degenerate_values() {
        let mean = finite_mean(vec![10.0, f64::INFINITY, 20.0, f64::NAN]);
        assert_eq!(mean, Some(15.0));
        assert_eq!(finite_mean(vec![f64::NAN]), None);
        assert_eq!(finite_mean(Vec::new()), None);
    }

    #[test]
    fn test_finite_std_needs_two_values() {
        assert_eq!(finite_std(vec![5.0]), None);
        let std = finite_std(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        // sample std of the classic example is ~2.138
        assert!((std - 2.138).abs() < 0.001);
    }

    #[test]
    fn test_min_max_median() {
        let values = [3.0, f64::NAN, 1.0, 2.0];
        assert_eq!(finite_min(&values), Some(1.0));
        assert_eq!(finite_max(&values), Some(3.0));
        assert!((finite_median(&values).unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(finite_median(&[]), None);
    }

    #[test]
    fn test_accumulator_tracks_contributions() {
        let mut acc = MetricAccumulator::new();
        assert!(acc.is_empty());

        let empty = HrvFeatures::default();
        assert!(!acc.push(&empty));
        assert!(acc.is_empty());

        let features = HrvFeatures {
            rmssd: Some(40.0),
            mean_hr: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(acc.push(&features));
        acc.push_value(Metric::Rmssd, Some(60.0));

        let means = acc.means();
        assert_eq!(means.rmssd, Some(50.0));
        assert_eq!(means.mean_hr, None);
        assert_eq!(acc.values(Metric::Rmssd).len(), 2);
    }
}
