//! Poincaré plot descriptors

use statrs::statistics::Statistics;

use crate::types::HrvFeatures;

/// Minimum number of intervals for Poincaré metrics
pub const MIN_INTERVALS: usize = 10;

/// Compute sd1, sd2 and their ratio into `features`
pub fn compute(nn: &[f64], features: &mut HrvFeatures) {
    if nn.len() < MIN_INTERVALS {
        return;
    }

    let diffs: Vec<f64> = nn.windows(2).map(|w| w[1] - w[0]).collect();
    let diff_var = diffs.iter().variance();
    let nn_var = nn.iter().variance();

    let sd1 = (0.5 * diff_var).sqrt();
    // negative radicand gives NaN, which sanitizing turns into null
    let sd2 = (2.0 * nn_var - 0.5 * diff_var).sqrt();

    features.sd1 = Some(sd1);
    features.sd2 = Some(sd2);
    features.ratio_sd2_sd1 = Some(sd2 / sd1);
}
