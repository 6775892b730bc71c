//! Frequency-domain HRV metrics
//!
//! Interval series are unevenly sampled in time, so spectral power is
//! estimated with a Lomb-Scargle periodogram over cumulative beat times
//! rather than by resampling onto a uniform grid.

use std::f64::consts::PI;

use statrs::statistics::Statistics;

use crate::types::HrvFeatures;

/// Minimum number of intervals for spectral metrics
pub const MIN_INTERVALS: usize = 10;

/// Frequency band in Hz, lower bound inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub fn contains(&self, freq: f64) -> bool {
        freq >= self.low && freq < self.high
    }
}

pub const VLF_BAND: Band = Band { low: 0.003, high: 0.04 };
pub const LF_BAND: Band = Band { low: 0.04, high: 0.15 };
pub const HF_BAND: Band = Band { low: 0.15, high: 0.40 };

/// Spacing of the evaluated frequency grid (Hz)
const FREQ_STEP: f64 = 0.001;

/// Power spectral density sampled on a frequency grid
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub freqs: Vec<f64>,
    pub power: Vec<f64>,
}

impl Spectrum {
    /// Trapezoidal integral of the density over one band
    pub fn band_power(&self, band: Band) -> f64 {
        self.freqs
            .windows(2)
            .zip(self.power.windows(2))
            .filter(|(f, _)| band.contains(f[0]) && band.contains(f[1]))
            .map(|(f, p)| 0.5 * (p[0] + p[1]) * (f[1] - f[0]))
            .sum()
    }
}

/// Evaluation grid from the bottom of VLF to the top of HF
fn frequency_grid() -> Vec<f64> {
    let steps = ((HF_BAND.high - VLF_BAND.low) / FREQ_STEP).round() as usize;
    (0..=steps)
        .map(|k| VLF_BAND.low + k as f64 * FREQ_STEP)
        .collect()
}

/// Lomb-Scargle periodogram of the mean-removed series, scaled to a
/// one-sided density in ms²/Hz. `None` for constant or too-short input.
pub fn lomb_scargle(nn: &[f64]) -> Option<Spectrum> {
    if nn.len() < MIN_INTERVALS {
        return None;
    }

    let mean = nn.iter().mean();
    let centered: Vec<f64> = nn.iter().map(|v| v - mean).collect();
    if centered.iter().all(|v| v.abs() < f64::EPSILON) {
        return None;
    }

    // beat times in seconds, first beat at zero
    let mut elapsed = 0.0;
    let times: Vec<f64> = nn
        .iter()
        .map(|v| {
            let t = elapsed;
            elapsed += v / 1000.0;
            t
        })
        .collect();
    let duration = elapsed;
    let scale = 2.0 * duration / nn.len() as f64;

    let freqs = frequency_grid();
    let power = freqs
        .iter()
        .map(|f| scale * periodogram_at(&times, &centered, 2.0 * PI * f))
        .collect();

    Some(Spectrum { freqs, power })
}

fn periodogram_at(times: &[f64], values: &[f64], omega: f64) -> f64 {
    let (sin2, cos2) = times.iter().fold((0.0, 0.0), |(s, c), t| {
        (s + (2.0 * omega * t).sin(), c + (2.0 * omega * t).cos())
    });
    let tau = sin2.atan2(cos2) / (2.0 * omega);

    let (mut xc, mut xs, mut cc, mut ss) = (0.0, 0.0, 0.0, 0.0);
    for (t, x) in times.iter().zip(values) {
        let arg = omega * (t - tau);
        let (s, c) = arg.sin_cos();
        xc += x * c;
        xs += x * s;
        cc += c * c;
        ss += s * s;
    }

    let mut p = 0.0;
    if cc > 0.0 {
        p += xc * xc / cc;
    }
    if ss > 0.0 {
        p += xs * xs / ss;
    }
    0.5 * p
}

/// Compute frequency-domain metrics into `features`
pub fn compute(nn: &[f64], features: &mut HrvFeatures) {
    let Some(spectrum) = lomb_scargle(nn) else {
        return;
    };

    let vlf = spectrum.band_power(VLF_BAND);
    let lf = spectrum.band_power(LF_BAND);
    let hf = spectrum.band_power(HF_BAND);

    features.vlf = Some(vlf);
    features.lf = Some(lf);
    features.hf = Some(hf);
    features.total_power = Some(vlf + lf + hf);
    features.lf_hf_ratio = Some(lf / hf);
    features.lfnu = Some(100.0 * lf / (lf + hf));
    features.hfnu = Some(100.0 * hf / (lf + hf));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Beats modulated by a sinusoid at `freq` Hz
    fn make_modulated(freq: f64, count: usize) -> Vec<f64> {
        let mut t = 0.0;
        (0..count)
            .map(|_| {
                let v = 850.0 + 40.0 * (2.0 * PI * freq * t).sin();
                t += v / 1000.0;
                v
            })
            .collect()
    }

    #[test]
    fn test_constant_series_has_no_spectrum() {
        assert!(lomb_scargle(&[800.0; 20]).is_none());
        let mut features = HrvFeatures::default();
        compute(&[800.0; 20], &mut features);
        assert!(!features.has_frequency_domain());
    }

    #[test]
    fn test_short_series_has_no_spectrum() {
        assert!(lomb_scargle(&[800.0, 820.0, 790.0]).is_none());
    }

    #[test]
    fn test_hf_oscillation_dominates() {
        let nn = make_modulated(0.25, 300);
        let mut features = HrvFeatures::default();
        compute(&nn, &mut features);

        let lf = features.lf.unwrap();
        let hf = features.hf.unwrap();
        assert!(hf > lf);
        assert!(features.lf_hf_ratio.unwrap() < 1.0);
        assert!((features.lfnu.unwrap() + features.hfnu.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_lf_oscillation_dominates() {
        let nn = make_modulated(0.1, 300);
        let mut features = HrvFeatures::default();
        compute(&nn, &mut features);
        assert!(features.lf_hf_ratio.unwrap() > 1.0);
    }

    #[test]
    fn test_band_power_integrates_inside_band() {
        let spectrum = Spectrum {
            freqs: vec![0.1, 0.2, 0.3],
            power: vec![2.0, 2.0, 2.0],
        };
        let band = Band { low: 0.0, high: 1.0 };
        assert!((spectrum.band_power(band) - 0.4).abs() < 1e-12);
        assert_eq!(spectrum.band_power(Band { low: 0.5, high: 1.0 }), 0.0);
    }
}
