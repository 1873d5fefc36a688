//! # Musical Tuning Module
//!
//! Equal-temperament conversions between frequencies, MIDI note numbers and
//! note names, plus the instrument presets that select the active frequency
//! window for peak search and pitch validation.
//!
//! ## Features
//! - 88-key note range (A0 = 21 to C8 = 108)
//! - Frequency to MIDI note conversion (A4 = 440 Hz = 69)
//! - Cent deviation calculations
//! - Guitar and piano range presets

use serde::{Deserialize, Serialize};

use crate::error::{ChordError, Result};

/// Chromatic note names indexed by pitch class (C = 0).
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Reference pitch for equal temperament.
pub const A4_FREQUENCY: f32 = 440.0;
/// MIDI note number of A4.
pub const A4_MIDI: i32 = 69;
/// Lowest piano key (A0).
pub const MIDI_MIN: i32 = 21;
/// Highest piano key (C8).
pub const MIDI_MAX: i32 = 108;

/// Fixed guitar search band in Hz.
pub const GUITAR_MIN_HZ: f32 = 50.0;
pub const GUITAR_MAX_HZ: f32 = 500.0;

/// Converts a MIDI note number to its equal-tempered frequency.
pub fn midi_to_frequency(midi: i32) -> f32 {
    A4_FREQUENCY * 2.0_f32.powf((midi - A4_MIDI) as f32 / 12.0)
}

/// Converts a frequency to a fractional MIDI note number.
///
/// Returns a non-finite value for non-positive frequencies; callers reject
/// those before rounding.
pub fn frequency_to_midi(freq: f32) -> f32 {
    A4_MIDI as f32 + 12.0 * (freq / A4_FREQUENCY).log2()
}

/// Pitch class (0-11) of a MIDI note number, also for negative input.
pub fn pitch_class(midi: i32) -> u8 {
    midi.rem_euclid(12) as u8
}

/// Name of a pitch class without octave, e.g. `"F#"`.
pub fn pitch_class_name(pitch_class: u8) -> &'static str {
    NOTE_NAMES[(pitch_class % 12) as usize]
}

/// Scientific octave number of a MIDI note (middle C = 60 is octave 4).
pub fn octave(midi: i32) -> i32 {
    midi.div_euclid(12) - 1
}

/// Full note name with octave, e.g. `"A4"` for 69.
pub fn note_name(midi: i32) -> String {
    format!("{}{}", pitch_class_name(pitch_class(midi)), octave(midi))
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values indicate sharpness, negative values flatness.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// The band of frequencies searched for peaks and accepted as pitches.
///
/// Both bounds are inclusive. A window is always finite, positive and
/// non-empty; construct it through [`FrequencyWindow::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyWindow {
    min: f32,
    max: f32,
}

impl FrequencyWindow {
    /// Creates a window, rejecting non-finite, non-positive or inverted bounds.
    pub fn new(min: f32, max: f32) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min >= max {
            return Err(ChordError::InvalidFrequencyWindow { min, max });
        }
        Ok(Self { min, max })
    }

    /// Creates a window spanning two MIDI notes (inclusive).
    pub fn from_midi_range(low: i32, high: i32) -> Result<Self> {
        Self::new(midi_to_frequency(low), midi_to_frequency(high))
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// True if `freq` lies inside the window.
    pub fn contains(&self, freq: f32) -> bool {
        freq >= self.min && freq <= self.max
    }
}

impl Default for FrequencyWindow {
    fn default() -> Self {
        Instrument::default().frequency_window()
    }
}

/// Named piano register presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PianoRange {
    #[default]
    Full,
    Bass,
    Middle,
    Treble,
}

impl PianoRange {
    pub const ALL: [PianoRange; 4] = [
        PianoRange::Full,
        PianoRange::Bass,
        PianoRange::Middle,
        PianoRange::Treble,
    ];

    /// Inclusive MIDI bounds of the preset.
    pub fn midi_bounds(self) -> (i32, i32) {
        match self {
            PianoRange::Full => (21, 108),
            PianoRange::Bass => (21, 52),
            PianoRange::Middle => (53, 83),
            PianoRange::Treble => (84, 108),
        }
    }

    pub fn frequency_window(self) -> FrequencyWindow {
        let (low, high) = self.midi_bounds();
        // Preset bounds are ascending MIDI notes, so the window is always valid.
        FrequencyWindow {
            min: midi_to_frequency(low),
            max: midi_to_frequency(high),
        }
    }
}

/// Instrument selection driving the base frequency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Instrument {
    #[default]
    Guitar,
    Piano { range: PianoRange },
}

impl Instrument {
    pub fn frequency_window(&self) -> FrequencyWindow {
        match self {
            Instrument::Guitar => FrequencyWindow {
                min: GUITAR_MIN_HZ,
                max: GUITAR_MAX_HZ,
            },
            Instrument::Piano { range } => range.frequency_window(),
        }
    }
}
