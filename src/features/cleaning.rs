//! RR interval cleaning

/// Shortest plausible interval (ms)
pub const LOW_RRI_MS: f64 = 300.0;
/// Longest plausible interval (ms)
pub const HIGH_RRI_MS: f64 = 2000.0;
/// Relative change above which a beat is considered ectopic
pub const MALIK_THRESHOLD: f64 = 0.2;
/// Minimum series length for cleaning to apply at all
pub const MIN_INTERVALS_FOR_CLEANING: usize = 10;

/// Result of cleaning a series of intervals
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedIntervals {
    pub intervals: Vec<f64>,
    pub removed: usize,
}

/// Drop intervals outside `[low, high]` ms and non-finite values
pub fn remove_outliers(intervals: &[f64], low: f64, high: f64) -> Vec<f64> {
    intervals
        .iter()
        .copied()
        .filter(|v| v.is_finite() && (low..=high).contains(v))
        .collect()
}

/// Malik rule: drop an interval differing by more than 20 % from the last
/// accepted one. The first interval is always accepted.
pub fn remove_ectopic_beats(intervals: &[f64]) -> Vec<f64> {
    let mut kept: Vec<f64> = Vec::with_capacity(intervals.len());
    for &interval in intervals {
        match kept.last() {
            Some(&previous) if (interval - previous).abs() > MALIK_THRESHOLD * previous => {}
            _ => kept.push(interval),
        }
    }
    kept
}

/// Apply outlier and ectopic removal to series long enough to clean.
///
/// Short series are returned untouched.
pub fn clean_intervals(intervals: &[f64], remove_outliers_flag: bool) -> CleanedIntervals {
    if intervals.len() < MIN_INTERVALS_FOR_CLEANING {
        return CleanedIntervals {
            intervals: intervals.to_vec(),
            removed: 0,
        };
    }

    let mut cleaned = if remove_outliers_flag {
        remove_outliers(intervals, LOW_RRI_MS, HIGH_RRI_MS)
    } else {
        intervals.to_vec()
    };
    if cleaned.len() >= MIN_INTERVALS_FOR_CLEANING {
        cleaned = remove_ectopic_beats(&cleaned);
    }

    CleanedIntervals {
        removed: intervals.len() - cleaned.len(),
        intervals: cleaned,
    }
}
