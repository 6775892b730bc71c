//! Time-domain HRV metrics

use statrs::statistics::Statistics;

use crate::stats::{finite_max, finite_median, finite_min};
use crate::types::HrvFeatures;

/// Minimum number of intervals for time-domain metrics
pub const MIN_INTERVALS: usize = 2;

/// Compute time-domain metrics into `features`.
///
/// Leaves the fields untouched when fewer than two intervals are given.
pub fn compute(nn: &[f64], features: &mut HrvFeatures) {
    if nn.len() < MIN_INTERVALS {
        return;
    }

    let diffs: Vec<f64> = nn.windows(2).map(|w| w[1] - w[0]).collect();
    let count = nn.len() as f64;

    let mean_nni = nn.iter().mean();
    let sdnn = nn.iter().std_dev();
    let rmssd = diffs.iter().map(|d| d * d).mean().sqrt();
    let nni_50 = diffs.iter().filter(|d| d.abs() > 50.0).count() as f64;
    let nni_20 = diffs.iter().filter(|d| d.abs() > 20.0).count() as f64;

    features.mean_nni = Some(mean_nni);
    features.sdnn = Some(sdnn);
    features.sdsd = Some(diffs.iter().population_std_dev());
    features.rmssd = Some(rmssd);
    features.median_nni = finite_median(nn);
    features.nni_50 = Some(nni_50);
    features.pnni_50 = Some(100.0 * nni_50 / count);
    features.nni_20 = Some(nni_20);
    features.pnni_20 = Some(100.0 * nni_20 / count);
    features.range_nni = finite_max(nn).zip(finite_min(nn)).map(|(hi, lo)| hi - lo);
    features.cvsd = Some(rmssd / mean_nni);
    features.cvnni = Some(sdnn / mean_nni);

    let heart_rate: Vec<f64> = nn.iter().map(|v| 60_000.0 / v).collect();
    features.mean_hr = Some(heart_rate.iter().mean());
    features.max_hr = finite_max(&heart_rate);
    features.min_hr = finite_min(&heart_rate);
    features.std_hr = Some(heart_rate.iter().std_dev());
}
