// chord-core/src/lib.rs

//! The core logic for the live chord listener.
//! This crate is responsible for spectral analysis, pitch detection
//! and chord recognition, plus the capture and worker plumbing that
//! feeds it. It is completely headless and contains no display code.

pub mod audio;
pub mod chord;
pub mod detector;
pub mod error;
pub mod fft;
pub mod peaks;
pub mod pitch;
pub mod settings;
pub mod tuning;
pub mod worker;

pub use chord::{Chord, ChordQuality, ChordRecognitionResult};
pub use detector::ChordDetector;
pub use error::{ChordError, Result};
pub use pitch::Pitch;
pub use settings::Settings;
pub use tuning::{FrequencyWindow, Instrument, PianoRange};

/// Represents the result of analysing a single audio block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockReport {
    /// Detected pitches, loudest first.
    pub pitches: Vec<Pitch>,
    /// The chord those pitches form, if any.
    pub recognition: ChordRecognitionResult,
}

impl BlockReport {
    /// True if the block held no detectable pitch.
    pub fn is_silent(&self) -> bool {
        self.pitches.is_empty()
    }

    /// Name of the recognized chord, e.g. `"Cmaj7/E"`.
    pub fn chord_name(&self) -> Option<String> {
        self.recognition.chord.map(|chord| chord.name())
    }
}
