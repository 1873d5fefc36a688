//! # Chord Matching Module
//!
//! Scores the detected pitch-class set against every chord template
//! (12 roots x 10 qualities) and keeps the best candidate, preferring the
//! simpler chord when scores tie.
//!
//! ## Scoring
//! - completeness: share of the template's notes that were detected
//! - purity: share of the detected notes that belong to the template
//! - confidence: geometric mean of the two, in [0, 1]

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{pitch::Pitch, tuning};

/// Results below this confidence are reported as "no chord".
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Candidates scoring more than this below the current best are rejected
/// outright. A candidate inside the margin still has to beat the best, or tie
/// it with fewer notes, to replace it.
pub const SIMPLICITY_MARGIN: f32 = 0.05;

/// Chord qualities in the order candidates are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Dominant7,
    Major7,
    Minor7,
    Suspended2,
    Suspended4,
    Power,
}

/// Semitone offsets from the root, indexed by `ChordQuality as usize`.
const QUALITY_INTERVALS: [&[u8]; 10] = [
    &[0, 4, 7],
    &[0, 3, 7],
    &[0, 3, 6],
    &[0, 4, 8],
    &[0, 4, 7, 10],
    &[0, 4, 7, 11],
    &[0, 3, 7, 10],
    &[0, 2, 7],
    &[0, 5, 7],
    &[0, 7],
];

/// Display suffixes, indexed like [`QUALITY_INTERVALS`].
const QUALITY_SYMBOLS: [&str; 10] = [
    "", "m", "dim", "aug", "7", "maj7", "m7", "sus2", "sus4", "5",
];

/// Pitch-class bitmask of every (root, quality) template, bit `n` = class `n`.
static TEMPLATES: Lazy<[[u16; 10]; 12]> = Lazy::new(|| {
    let mut templates = [[0u16; 10]; 12];
    for (root, row) in templates.iter_mut().enumerate() {
        for quality in ChordQuality::ALL {
            row[quality.index()] = quality
                .intervals()
                .iter()
                .fold(0u16, |mask, &offset| mask | 1 << ((root + offset as usize) % 12));
        }
    }
    templates
});

impl ChordQuality {
    pub const ALL: [ChordQuality; 10] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::Dominant7,
        ChordQuality::Major7,
        ChordQuality::Minor7,
        ChordQuality::Suspended2,
        ChordQuality::Suspended4,
        ChordQuality::Power,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Ascending semitone offsets from the root, always starting at 0.
    pub fn intervals(self) -> &'static [u8] {
        QUALITY_INTERVALS[self.index()]
    }

    /// Suffix used in chord names, e.g. `"maj7"`.
    pub fn symbol(self) -> &'static str {
        QUALITY_SYMBOLS[self.index()]
    }
}

/// A recognized chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    /// Root pitch class (0-11).
    pub root: u8,
    pub quality: ChordQuality,
    /// Pitch class of the lowest sounding note, if known.
    pub bass: Option<u8>,
}

impl Chord {
    /// Chord name such as `"Am"` or `"Cmaj7/E"`.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Pitch classes the chord is made of.
    pub fn pitch_classes(&self) -> Vec<u8> {
        self.quality
            .intervals()
            .iter()
            .map(|&offset| (self.root + offset) % 12)
            .collect()
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            tuning::pitch_class_name(self.root),
            self.quality.symbol()
        )?;
        match self.bass {
            Some(bass) if bass % 12 != self.root % 12 => {
                write!(f, "/{}", tuning::pitch_class_name(bass))
            }
            _ => Ok(()),
        }
    }
}

/// Outcome of one recognition pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordRecognitionResult {
    pub chord: Option<Chord>,
    /// Confidence in [0, 1]; 0 when no chord was found.
    pub confidence: f32,
}

impl ChordRecognitionResult {
    pub fn none() -> Self {
        Self {
            chord: None,
            confidence: 0.0,
        }
    }
}

impl Default for ChordRecognitionResult {
    fn default() -> Self {
        Self::none()
    }
}

/// Classifies a pitch list as a chord.
///
/// # Arguments
/// * `pitches` - Detected pitches in any order; the lowest note sets the bass
///
/// # Returns
/// The best chord and its confidence, or [`ChordRecognitionResult::none`]
/// for fewer than two pitches, no template sharing two pitch classes with
/// the input, or a confidence below [`MIN_CONFIDENCE`].
pub fn recognize(pitches: &[Pitch]) -> ChordRecognitionResult {
    if pitches.len() < 2 {
        return ChordRecognitionResult::none();
    }

    let detected = pitches
        .iter()
        .fold(0u16, |mask, p| mask | 1 << p.pitch_class());
    let bass = pitches
        .iter()
        .min_by_key(|p| p.note_number)
        .map(|p| p.pitch_class());

    match best_match(detected) {
        Some((root, quality, confidence)) if confidence >= MIN_CONFIDENCE => {
            ChordRecognitionResult {
                chord: Some(Chord {
                    root,
                    quality,
                    bass,
                }),
                confidence,
            }
        }
        _ => ChordRecognitionResult::none(),
    }
}

/// Scores a pitch-class mask against all templates.
///
/// Candidates are visited root-major, quality-minor in declared order. A
/// candidate is discarded if it scores more than [`SIMPLICITY_MARGIN`] below
/// the current best, or below it without being simpler. It replaces the best
/// if it scores higher, or equally with fewer notes.
pub fn best_match(detected: u16) -> Option<(u8, ChordQuality, f32)> {
    let detected = detected & 0x0fff;
    let detected_count = detected.count_ones();
    if detected_count == 0 {
        return None;
    }

    let mut best: Option<(u8, ChordQuality)> = None;
    let mut best_confidence = 0.0_f32;
    let mut best_size = u32::MAX;

    for (root, row) in TEMPLATES.iter().enumerate() {
        for quality in ChordQuality::ALL {
            let required = row[quality.index()];
            let chord_size = required.count_ones();
            let matched = (detected & required).count_ones();
            if matched < 2 {
                continue;
            }

            let completeness = matched as f32 / chord_size as f32;
            let purity = matched as f32 / detected_count as f32;
            let confidence = (completeness * purity).sqrt();

            if confidence < best_confidence - SIMPLICITY_MARGIN
                || (confidence < best_confidence && chord_size >= best_size)
            {
                continue;
            }

            if confidence > best_confidence
                || (confidence == best_confidence && chord_size < best_size)
            {
                trace!(
                    "chord candidate {}{} confidence={:.3} size={}",
                    tuning::pitch_class_name(root as u8),
                    quality.symbol(),
                    confidence,
                    chord_size
                );
                best = Some((root as u8, quality));
                best_confidence = confidence;
                best_size = chord_size;
            }
        }
    }

    best.map(|(root, quality)| (root, quality, best_confidence))
}
