//! # Spectral Analysis Module
//!
//! Turns a fixed-length block of samples into a decibel-scaled power spectrum
//! and its frequency axis.
//!
//! ## Features
//! - High-performance FFT using RustFFT
//! - Hann window precomputed once at construction
//! - All working buffers allocated up front and reused for every block, so
//!   the per-block path never touches the heap

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use tracing::debug;

use crate::error::{ChordError, Result};

/// Default transform length (about 93 ms at 44.1 kHz).
pub const DEFAULT_TRANSFORM_SIZE: usize = 4096;

/// Reference power for the decibel conversion. Powers below it map to 0 dB,
/// which keeps silent bins finite.
pub const DB_REFERENCE: f32 = 1e-4;

/// A borrowed view of the most recent spectrum computed by a
/// [`SpectralAnalyzer`].
#[derive(Debug, Clone, Copy)]
pub struct Spectrum<'a> {
    /// Decibel-scaled power per bin, `transform_size / 2` entries.
    pub magnitudes: &'a [f32],
    /// Centre frequency of each bin in Hz.
    pub frequencies: &'a [f32],
    /// Distance between neighbouring bins in Hz.
    pub bin_width: f32,
}

/// Windowed FFT front end owning every buffer it works in.
///
/// One analyzer must be driven from one thread at a time; `analyze` takes
/// `&mut self` so the borrow checker enforces that.
pub struct SpectralAnalyzer {
    transform_size: usize,
    fft: Arc<dyn Fft<f32>>,
    /// Hann window coefficients
    window: Vec<f32>,
    /// Complex transform buffer (real and imaginary parts)
    fft_buffer: Vec<Complex<f32>>,
    /// Scratch space requested by the FFT plan
    scratch_buffer: Vec<Complex<f32>>,
    /// Squared magnitude per bin
    power: Vec<f32>,
    /// Decibel-scaled power per bin
    magnitudes: Vec<f32>,
    /// Frequency of each bin for `axis_sample_rate`
    frequencies: Vec<f32>,
    axis_sample_rate: u32,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("transform_size", &self.transform_size)
            .field("axis_sample_rate", &self.axis_sample_rate)
            .finish_non_exhaustive()
    }
}

impl SpectralAnalyzer {
    /// Plans the transform and allocates every buffer.
    ///
    /// Fails if `transform_size` is not a power of two of at least 4. Without
    /// a working transform there is nothing useful the analyzer could do.
    pub fn new(transform_size: usize) -> Result<Self> {
        if transform_size < 4 || !transform_size.is_power_of_two() {
            return Err(ChordError::InvalidTransformSize(transform_size));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(transform_size);
        let scratch_len = fft.get_inplace_scratch_len();
        let half_size = transform_size / 2;

        debug!(
            "SpectralAnalyzer created: transform_size={}, scratch_len={}",
            transform_size, scratch_len
        );

        Ok(Self {
            transform_size,
            fft,
            window: hann_window(transform_size),
            fft_buffer: vec![Complex::new(0.0, 0.0); transform_size],
            scratch_buffer: vec![Complex::new(0.0, 0.0); scratch_len],
            power: vec![0.0; half_size],
            magnitudes: vec![0.0; half_size],
            frequencies: vec![0.0; half_size],
            axis_sample_rate: 0,
        })
    }

    pub fn transform_size(&self) -> usize {
        self.transform_size
    }

    /// Number of bins returned per spectrum.
    pub fn bin_count(&self) -> usize {
        self.transform_size / 2
    }

    /// Computes the spectrum of the first `transform_size` samples.
    ///
    /// Extra samples beyond `transform_size` are ignored.
    ///
    /// # Arguments
    /// * `samples` - Mono input block
    /// * `sample_rate` - Sample rate in Hz, used for the frequency axis
    ///
    /// # Returns
    /// * `Some(spectrum)` - dB levels and bin frequencies for bins `0..transform_size / 2`
    /// * `None` - Fewer than `transform_size` samples, or a zero sample rate
    pub fn analyze(&mut self, samples: &[f32], sample_rate: u32) -> Option<Spectrum<'_>> {
        if samples.len() < self.transform_size || sample_rate == 0 {
            return None;
        }

        for ((slot, &sample), &w) in self
            .fft_buffer
            .iter_mut()
            .zip(samples.iter())
            .zip(self.window.iter())
        {
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch_buffer);

        // re^2 + im^2 is enough for relative comparisons; no square root needed.
        for (power, c) in self.power.iter_mut().zip(self.fft_buffer.iter()) {
            *power = c.norm_sqr();
        }
        for (db, &power) in self.magnitudes.iter_mut().zip(self.power.iter()) {
            *db = power_to_db(power);
        }

        if sample_rate != self.axis_sample_rate {
            let bin_width = sample_rate as f32 / self.transform_size as f32;
            for (i, freq) in self.frequencies.iter_mut().enumerate() {
                *freq = i as f32 * bin_width;
            }
            self.axis_sample_rate = sample_rate;
        }

        Some(Spectrum {
            magnitudes: &self.magnitudes,
            frequencies: &self.frequencies,
            bin_width: sample_rate as f32 / self.transform_size as f32,
        })
    }
}

/// Symmetric Hann window of length `n`.
fn hann_window(n: usize) -> Vec<f32> {
    let n_minus_1 = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos()))
        .collect()
}

/// Converts a power value to decibels relative to [`DB_REFERENCE`].
pub fn power_to_db(power: f32) -> f32 {
    10.0 * (power.max(DB_REFERENCE) / DB_REFERENCE).log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_rejects_invalid_sizes() {
        assert!(matches!(
            SpectralAnalyzer::new(0),
            Err(ChordError::InvalidTransformSize(0))
        ));
        assert!(SpectralAnalyzer::new(2).is_err());
        assert!(SpectralAnalyzer::new(1000).is_err());
        assert!(SpectralAnalyzer::new(1024).is_ok());
    }

    #[test]
    fn test_short_input_yields_nothing() {
        let mut analyzer = SpectralAnalyzer::new(1024).unwrap();
        assert!(analyzer.analyze(&vec![0.0; 1023], 44100).is_none());
        assert!(analyzer.analyze(&vec![0.0; 1024], 0).is_none());
        assert!(analyzer.analyze(&vec![0.0; 1024], 44100).is_some());
    }

    #[test]
    fn test_hann_window_shape() {
        let window = hann_window(8);
        assert_abs_diff_eq!(window[0], 0.0);
        assert_abs_diff_eq!(window[7], 0.0, epsilon = 1e-6);
        assert!(window[3] > 0.9 && window[4] > 0.9);
    }

    #[test]
    fn test_silence_sits_on_the_floor() {
        let mut analyzer = SpectralAnalyzer::new(1024).unwrap();
        let spectrum = analyzer.analyze(&vec![0.0; 1024], 44100).unwrap();
        assert_eq!(spectrum.magnitudes.len(), 512);
        assert!(spectrum.magnitudes.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_frequency_axis() {
        let mut analyzer = SpectralAnalyzer::new(4096).unwrap();
        let spectrum = analyzer.analyze(&vec![0.0; 4096], 44100).unwrap();
        assert_eq!(spectrum.frequencies.len(), 2048);
        assert_abs_diff_eq!(spectrum.bin_width, 44100.0 / 4096.0);
        assert_abs_diff_eq!(spectrum.frequencies[0], 0.0);
        assert_abs_diff_eq!(spectrum.frequencies[10], 10.0 * 44100.0 / 4096.0, epsilon = 1e-3);

        // A different sample rate rebuilds the axis in place.
        let spectrum = analyzer.analyze(&vec![0.0; 4096], 48000).unwrap();
        assert_abs_diff_eq!(spectrum.frequencies[10], 10.0 * 48000.0 / 4096.0, epsilon = 1e-3);
    }

    #[test]
    fn test_tone_peaks_at_expected_bin() {
        let mut analyzer = SpectralAnalyzer::new(4096).unwrap();
        let samples = sine(440.0, 44100.0, 4096);
        let spectrum = analyzer.analyze(&samples, 44100).unwrap();

        let (peak_bin, _) = spectrum
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        // 440 Hz / 10.77 Hz per bin = 40.9
        assert_eq!(peak_bin, 41);
        assert!(spectrum.magnitudes[peak_bin] > 80.0);
    }

    #[test]
    fn test_buffers_are_reused() {
        let mut analyzer = SpectralAnalyzer::new(1024).unwrap();
        let samples = sine(1000.0, 44100.0, 2048);
        let first = analyzer.analyze(&samples, 44100).unwrap().magnitudes.as_ptr();
        let second = analyzer.analyze(&samples, 44100).unwrap().magnitudes.as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_power_to_db() {
        assert_abs_diff_eq!(power_to_db(0.0), 0.0);
        assert_abs_diff_eq!(power_to_db(1e-4), 0.0);
        assert_abs_diff_eq!(power_to_db(1e-2), 20.0, epsilon = 1e-4);
    }
}
