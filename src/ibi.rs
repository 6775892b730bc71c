//! Inter-beat interval conversion
//!
//! Pure elementwise transform from heart-rate samples to IBI samples.
//! Nothing is rejected here; degenerate values are dropped downstream.

use crate::types::{IbiSample, RawSample};

/// Milliseconds per minute, used to turn bpm into a beat interval
const MS_PER_MINUTE: f64 = 60_000.0;

/// Convert a bpm value into an inter-beat interval in milliseconds
pub fn bpm_to_ibi_ms(bpm: f64) -> f64 {
    MS_PER_MINUTE / bpm
}

/// Convert raw samples into IBI samples, preserving order and cardinality
pub fn to_ibi_samples(samples: &[RawSample]) -> Vec<IbiSample> {
    let mut previous: Option<&RawSample> = None;
    samples
        .iter()
        .map(|sample| {
            let delta_sec = previous.map(|prev| {
                (sample.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0
            });
            previous = Some(sample);
            IbiSample {
                timestamp: sample.timestamp,
                bpm: sample.bpm,
                ibi_ms: bpm_to_ibi_ms(sample.bpm),
                delta_sec,
            }
        })
        .collect()
}
