//! # Chord Detector
//!
//! The synchronous entry points used by the capture/worker layer: one
//! detector per audio stream, called from one thread at a time.

use tracing::{debug, trace};

use crate::{
    BlockReport,
    chord::{self, ChordRecognitionResult},
    error::Result,
    fft::SpectralAnalyzer,
    peaks::{self, Peak},
    pitch::{self, Pitch},
    settings::Settings,
    tuning::{FrequencyWindow, Instrument},
};

/// Runs spectrum, peak, pitch and chord stages over sample blocks.
#[derive(Debug)]
pub struct ChordDetector {
    analyzer: SpectralAnalyzer,
    window: FrequencyWindow,
    /// Peak list reused across blocks
    peaks: Vec<Peak>,
}

impl ChordDetector {
    /// Builds a detector with the given transform length and search band.
    pub fn new(transform_size: usize, window: FrequencyWindow) -> Result<Self> {
        let analyzer = SpectralAnalyzer::new(transform_size)?;
        debug!(
            "ChordDetector created: transform_size={}, window={:.1}-{:.1} Hz",
            transform_size,
            window.min(),
            window.max()
        );
        Ok(Self {
            peaks: Vec::with_capacity(analyzer.bin_count() / 2),
            analyzer,
            window,
        })
    }

    pub fn for_instrument(instrument: Instrument, transform_size: usize) -> Result<Self> {
        Self::new(transform_size, instrument.frequency_window())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Self::new(settings.transform_size, settings.frequency_window())
    }

    pub fn transform_size(&self) -> usize {
        self.analyzer.transform_size()
    }

    pub fn frequency_window(&self) -> FrequencyWindow {
        self.window
    }

    /// Replaces the active search band for subsequent blocks.
    ///
    /// An invalid band is rejected and the previous one stays active.
    pub fn set_frequency_window(&mut self, min: f32, max: f32) -> Result<()> {
        self.window = FrequencyWindow::new(min, max)?;
        debug!("Frequency window set to {:.1}-{:.1} Hz", min, max);
        Ok(())
    }

    /// Detects the pitches in the first `transform_size` samples.
    ///
    /// # Arguments
    /// * `samples` - Mono input block
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// Pitches inside the frequency window, loudest first. Empty for short
    /// blocks or when nothing qualifies.
    pub fn detect_pitches(&mut self, samples: &[f32], sample_rate: u32) -> Vec<Pitch> {
        let Some(spectrum) = self.analyzer.analyze(samples, sample_rate) else {
            trace!(
                "Block of {} samples skipped (transform_size={})",
                samples.len(),
                self.analyzer.transform_size()
            );
            return Vec::new();
        };

        peaks::find_peaks_into(
            spectrum.magnitudes,
            spectrum.frequencies,
            &self.window,
            &mut self.peaks,
        );
        let pitches = pitch::collect_pitches(&self.peaks, &self.window);
        trace!("{} peaks -> {} pitches", self.peaks.len(), pitches.len());
        pitches
    }

    /// Classifies a pitch list as a chord.
    pub fn recognize_chord(&self, pitches: &[Pitch]) -> ChordRecognitionResult {
        chord::recognize(pitches)
    }

    /// Runs the whole pipeline on one block.
    pub fn analyze_block(&mut self, samples: &[f32], sample_rate: u32) -> BlockReport {
        let pitches = self.detect_pitches(samples, sample_rate);
        let recognition = self.recognize_chord(&pitches);
        BlockReport {
            pitches,
            recognition,
        }
    }
}
