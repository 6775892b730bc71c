//! Window aggregation for IBI samples.
//!
//! Samples are first averaged onto a uniform one-minute grid anchored to
//! local calendar minutes, missing IBI minutes are filled by time-weighted
//! linear interpolation, and the minutes are then grouped into fixed-width
//! windows (default 15 minutes) that feed feature computation.

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::debug;

use crate::calendar::MinuteGrid;
use crate::config::DEFAULT_WINDOW_MINUTES;
use crate::stats::finite_mean;
use crate::types::{IbiSample, Window};

/// Per-minute running sums for one grid slot
#[derive(Debug, Clone, Copy, Default)]
struct MinuteAccumulator {
    bpm_sum: f64,
    bpm_count: u32,
    ibi_sum: f64,
    ibi_count: u32,
}

impl MinuteAccumulator {
    fn add(&mut self, sample: &IbiSample) {
        if sample.bpm.is_finite() && sample.bpm > 0.0 {
            self.bpm_sum += sample.bpm;
            self.bpm_count += 1;
        }
        if sample.ibi_ms.is_finite() {
            self.ibi_sum += sample.ibi_ms;
            self.ibi_count += 1;
        }
    }

    fn bpm(&self) -> Option<f64> {
        (self.bpm_count > 0).then(|| self.bpm_sum / f64::from(self.bpm_count))
    }

    fn ibi_ms(&self) -> Option<f64> {
        (self.ibi_count > 0).then(|| self.ibi_sum / f64::from(self.ibi_count))
    }
}

/// bpm and IBI means on a dense one-minute grid
#[derive(Debug, Clone, PartialEq)]
pub struct MinuteSeries {
    grid: MinuteGrid,
    first_slot: i64,
    bpm: Vec<Option<f64>>,
    ibi_ms: Vec<Option<f64>>,
}

impl MinuteSeries {
    /// Average samples into calendar minutes; `None` for empty input
    pub fn resample(samples: &[IbiSample]) -> Option<Self> {
        let earliest = samples.iter().map(|s| s.timestamp).min()?;
        let grid = MinuteGrid::anchored_at(&earliest);

        let slots: Vec<i64> = samples.iter().map(|s| grid.slot(&s.timestamp)).collect();
        let first_slot = slots.iter().copied().min()?;
        let last_slot = slots.iter().copied().max()?;
        let len = usize::try_from(last_slot - first_slot + 1).ok()?;

        let mut minutes = vec![MinuteAccumulator::default(); len];
        for (sample, slot) in samples.iter().zip(&slots) {
            // slot >= first_slot by construction
            minutes[(slot - first_slot) as usize].add(sample);
        }

        Some(Self {
            grid,
            first_slot,
            bpm: minutes.iter().map(MinuteAccumulator::bpm).collect(),
            ibi_ms: minutes.iter().map(MinuteAccumulator::ibi_ms).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.ibi_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ibi_ms.is_empty()
    }

    /// Start instant of the `index`-th minute in the series
    pub fn minute_start(&self, index: usize) -> DateTime<Tz> {
        self.grid.slot_start(self.first_slot + index as i64)
    }

    pub fn bpm(&self) -> &[Option<f64>] {
        &self.bpm
    }

    pub fn ibi_ms(&self) -> &[Option<f64>] {
        &self.ibi_ms
    }

    /// Fill interior IBI gaps by interpolating over minute timestamps
    pub fn interpolate_ibi(&mut self) {
        let times: Vec<f64> = (0..self.len())
            .map(|i| (self.minute_start(i) - self.grid.origin()).num_seconds() as f64)
            .collect();
        interpolate_by_time(&times, &mut self.ibi_ms);
    }
}

/// Linear interpolation weighted by actual time positions.
///
/// Only gaps bounded by known values on both sides are filled; leading and
/// trailing gaps stay missing.
pub fn interpolate_by_time(times: &[f64], values: &mut [Option<f64>]) {
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    for pair in known.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        if right - left < 2 {
            continue;
        }
        let (Some(v0), Some(v1)) = (values[left], values[right]) else {
            continue;
        };
        let (t0, t1) = (times[left], times[right]);
        let span = t1 - t0;
        if span <= 0.0 {
            continue;
        }
        for i in (left + 1)..right {
            let weight = (times[i] - t0) / span;
            values[i] = Some(v0 + (v1 - v0) * weight);
        }
    }
}

/// Groups IBI samples into fixed-width analysis windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAggregator {
    window_minutes: u32,
}

impl Default for WindowAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MINUTES)
    }
}

impl WindowAggregator {
    /// Create an aggregator; a zero width is treated as one minute
    pub fn new(window_minutes: u32) -> Self {
        Self {
            window_minutes: window_minutes.max(1),
        }
    }

    pub fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    /// Resample, interpolate and window the samples.
    ///
    /// Windows are returned in ascending start order; windows left without
    /// any IBI value are dropped.
    pub fn aggregate(&self, samples: &[IbiSample]) -> Vec<Window> {
        let Some(mut series) = MinuteSeries::resample(samples) else {
            return Vec::new();
        };
        series.interpolate_ibi();
        let windows = self.group(&series);

        debug!(
            samples = samples.len(),
            minutes = series.len(),
            windows = windows.len(),
            width = self.window_minutes,
            "aggregated heart rate into windows"
        );
        windows
    }

    /// Group a minute series into windows anchored on the same grid
    pub fn group(&self, series: &MinuteSeries) -> Vec<Window> {
        let width = i64::from(self.window_minutes);
        let mut windows = Vec::new();
        let mut current: Option<(i64, Vec<f64>, Vec<f64>)> = None;

        for index in 0..series.len() {
            let slot = series.first_slot + index as i64;
            let window_slot = slot.div_euclid(width);

            if current.as_ref().map_or(true, |(w, _, _)| *w != window_slot) {
                if let Some(done) = current.take() {
                    windows.extend(self.finish(series, done));
                }
                current = Some((window_slot, Vec::new(), Vec::new()));
            }

            if let Some((_, bpm, ibi)) = current.as_mut() {
                bpm.extend(series.bpm[index]);
                ibi.extend(series.ibi_ms[index]);
            }
        }
        if let Some(done) = current.take() {
            windows.extend(self.finish(series, done));
        }
        windows
    }

    fn finish(
        &self,
        series: &MinuteSeries,
        (window_slot, bpm, ibi_values): (i64, Vec<f64>, Vec<f64>),
    ) -> Option<Window> {
        if ibi_values.is_empty() {
            return None;
        }
        let start_slot = window_slot * i64::from(self.window_minutes);
        Some(Window {
            window_start: series.grid.slot_start(start_slot),
            bpm_mean: finite_mean(bpm),
            ibi_values,
        })
    }
}
