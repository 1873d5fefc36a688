//! # Peak Extraction Module
//!
//! Finds strict local maxima of a decibel spectrum inside a frequency window
//! and refines each one with parabolic interpolation for sub-bin accuracy.

use crate::tuning::FrequencyWindow;

/// Minimum level (dB above the floor reference) a bin needs to count as a peak.
pub const PEAK_THRESHOLD_DB: f32 = 0.1;

/// Below this curvature the three-point parabola is treated as flat and the
/// raw bin frequency is kept.
const FLAT_TOP_EPSILON: f32 = 1e-4;

/// A spectral peak with its refined frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Bin index of the local maximum.
    pub bin: usize,
    /// Refined frequency in Hz.
    pub frequency: f32,
    /// Level of the peak bin in dB.
    pub magnitude: f32,
}

/// Returns every peak in `window`, ordered by ascending bin index.
pub fn find_peaks(magnitudes: &[f32], frequencies: &[f32], window: &FrequencyWindow) -> Vec<Peak> {
    let mut peaks = Vec::new();
    find_peaks_into(magnitudes, frequencies, window, &mut peaks);
    peaks
}

/// Like [`find_peaks`], but writes into a caller-owned buffer so repeated
/// calls can reuse its capacity. The buffer is cleared first.
pub fn find_peaks_into(
    magnitudes: &[f32],
    frequencies: &[f32],
    window: &FrequencyWindow,
    peaks: &mut Vec<Peak>,
) {
    peaks.clear();

    let half_count = magnitudes.len().min(frequencies.len());
    if half_count < 4 {
        return;
    }
    let bin_width = frequencies[1] - frequencies[0];
    if bin_width.is_nan() || bin_width <= 0.0 {
        return;
    }

    let min_bin = ((window.min() / bin_width).floor() as usize).max(1);
    let max_bin = ((window.max() / bin_width).floor() as usize).min(half_count - 2);
    if min_bin >= max_bin {
        return;
    }

    // Interior bins only, so every candidate has two neighbours.
    for i in (min_bin + 1)..max_bin {
        let alpha = magnitudes[i - 1];
        let beta = magnitudes[i];
        let gamma = magnitudes[i + 1];

        if beta <= PEAK_THRESHOLD_DB || beta <= alpha || beta <= gamma {
            continue;
        }

        let frequency = refine_peak(alpha, beta, gamma, frequencies[i], bin_width);
        if !window.contains(frequency) {
            continue;
        }

        peaks.push(Peak {
            bin: i,
            frequency,
            magnitude: beta,
        });
    }
}

/// Fits a parabola through three neighbouring levels and returns the
/// frequency of its vertex.
///
/// `alpha`, `beta` and `gamma` are the levels of the previous, peak and next
/// bins. A flat top falls back to `bin_frequency`.
pub fn refine_peak(alpha: f32, beta: f32, gamma: f32, bin_frequency: f32, bin_width: f32) -> f32 {
    let denom = alpha - 2.0 * beta + gamma;
    if denom.abs() <= FLAT_TOP_EPSILON {
        return bin_frequency;
    }
    let offset = 0.5 * (alpha - gamma) / denom;
    bin_frequency + offset * bin_width
}
