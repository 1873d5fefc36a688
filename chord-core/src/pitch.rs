//! # Pitch Mapping Module
//!
//! Maps refined peak frequencies onto equal-tempered notes and collapses
//! near-identical frequencies into a single pitch.
//!
//! ## Features
//! - Window and 88-key range validation
//! - Note naming with octave (e.g. "A4", "C#3")
//! - 0.9% near-duplicate suppression (about 15 cents)
//! - Loudest-first ordering of the final pitch list

use std::cmp::Ordering;

use crate::{
    peaks::Peak,
    tuning::{self, FrequencyWindow, MIDI_MAX, MIDI_MIN},
};

/// Relative distance under which two frequencies count as the same pitch.
pub const DUPLICATE_TOLERANCE: f32 = 0.009;

/// A detected musical pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct Pitch {
    /// Refined frequency in Hz, always inside the active window.
    pub frequency: f32,
    /// Level of the spectral peak in dB.
    pub amplitude: f32,
    /// Note name with octave, e.g. "A4".
    pub note_name: String,
    /// MIDI note number in 21..=108.
    pub note_number: u8,
}

impl Pitch {
    /// Pitch class, C = 0 through B = 11.
    pub fn pitch_class(&self) -> u8 {
        tuning::pitch_class(self.note_number as i32)
    }

    pub fn octave(&self) -> i32 {
        tuning::octave(self.note_number as i32)
    }

    /// How far the measured frequency sits from the equal-tempered note.
    pub fn cents_deviation(&self) -> f32 {
        let target = tuning::midi_to_frequency(self.note_number as i32);
        tuning::calculate_cents_deviation(self.frequency, target)
    }
}

/// Converts a frequency into a [`Pitch`].
///
/// Returns `None` if the frequency lies outside `window` or rounds to a note
/// outside the piano range A0..C8.
pub fn to_pitch(frequency: f32, amplitude: f32, window: &FrequencyWindow) -> Option<Pitch> {
    if !window.contains(frequency) {
        return None;
    }

    let midi = tuning::frequency_to_midi(frequency).round();
    if !midi.is_finite() || midi < MIDI_MIN as f32 || midi > MIDI_MAX as f32 {
        return None;
    }
    let midi = midi as i32;

    Some(Pitch {
        frequency,
        amplitude,
        note_name: tuning::note_name(midi),
        note_number: midi as u8,
    })
}

/// True if `a` and `b` are within [`DUPLICATE_TOLERANCE`] of `b`.
pub fn is_near_duplicate(a: f32, b: f32) -> bool {
    (a - b).abs() < b * DUPLICATE_TOLERANCE
}

/// Builds the pitch list for one block.
///
/// Peaks are scanned in the order given (ascending bin order when they come
/// from [`crate::peaks::find_peaks`]); a candidate is dropped if an already
/// accepted pitch lies within 0.9% of it, so the lower-frequency member of a
/// close pair wins. The result is then sorted loudest first, keeping scan
/// order among equal amplitudes.
pub fn collect_pitches(peaks: &[Peak], window: &FrequencyWindow) -> Vec<Pitch> {
    let mut pitches: Vec<Pitch> = Vec::with_capacity(peaks.len());

    for peak in peaks {
        let Some(pitch) = to_pitch(peak.frequency, peak.magnitude, window) else {
            continue;
        };
        if pitches
            .iter()
            .any(|kept| is_near_duplicate(kept.frequency, pitch.frequency))
        {
            continue;
        }
        pitches.push(pitch);
    }

    pitches.sort_by(|a, b| {
        b.amplitude
            .partial_cmp(&a.amplitude)
            .unwrap_or(Ordering::Equal)
    });
    pitches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::PianoRange;
    use approx::assert_abs_diff_eq;

    fn peak(frequency: f32, magnitude: f32) -> Peak {
        Peak {
            bin: 0,
            frequency,
            magnitude,
        }
    }

    #[test]
    fn test_a4() {
        let window = PianoRange::Full.frequency_window();
        let pitch = to_pitch(440.0, 60.0, &window).unwrap();
        assert_eq!(pitch.note_name, "A4");
        assert_eq!(pitch.note_number, 69);
        assert_eq!(pitch.pitch_class(), 9);
        assert_eq!(pitch.octave(), 4);
        assert_abs_diff_eq!(pitch.cents_deviation(), 0.0);
    }

    #[test]
    fn test_rounds_to_nearest_note() {
        let window = PianoRange::Full.frequency_window();
        // 40 cents sharp of A4 still rounds to A4, 60 cents sharp rounds to A#4.
        let sharp = 440.0 * 2.0_f32.powf(0.40 / 12.0);
        assert_eq!(to_pitch(sharp, 1.0, &window).unwrap().note_name, "A4");
        let sharper = 440.0 * 2.0_f32.powf(0.60 / 12.0);
        assert_eq!(to_pitch(sharper, 1.0, &window).unwrap().note_name, "A#4");
        assert!(to_pitch(sharp, 1.0, &window).unwrap().cents_deviation() > 39.0);
    }

    #[test]
    fn test_middle_c_and_extremes() {
        let window = FrequencyWindow::new(20.0, 5000.0).unwrap();
        assert_eq!(to_pitch(261.63, 1.0, &window).unwrap().note_name, "C4");
        assert_eq!(to_pitch(27.5, 1.0, &window).unwrap().note_number, 21);
        assert_eq!(to_pitch(4186.0, 1.0, &window).unwrap().note_name, "C8");
        // Below A0 and above C8 even though the window allows them.
        assert!(to_pitch(25.0, 1.0, &window).is_none());
        assert!(to_pitch(4500.0, 1.0, &window).is_none());
    }

    #[test]
    fn test_rejects_outside_window() {
        let window = FrequencyWindow::new(50.0, 500.0).unwrap();
        assert!(to_pitch(49.0, 1.0, &window).is_none());
        assert!(to_pitch(523.25, 1.0, &window).is_none());
    }

    #[test]
    fn test_boundary_frequencies_never_map() {
        let wide = FrequencyWindow::new(0.1, 25000.0).unwrap();
        for window in [wide, PianoRange::Full.frequency_window()] {
            assert!(to_pitch(0.2, 1.0, &window).is_none());
            assert!(to_pitch(20000.0, 1.0, &window).is_none());
        }
    }

    #[test]
    fn test_near_duplicate_tolerance() {
        assert!(is_near_duplicate(440.0, 443.8));
        assert!(!is_near_duplicate(440.0, 444.5));
        assert!(!is_near_duplicate(440.0, 466.16));
    }

    #[test]
    fn test_collect_deduplicates_in_scan_order() {
        let window = PianoRange::Full.frequency_window();
        let peaks = [peak(440.0, 50.0), peak(443.0, 70.0)];

        let pitches = collect_pitches(&peaks, &window);
        assert_eq!(pitches.len(), 1);
        // First scanned wins even though the second is louder.
        assert_eq!(pitches[0].frequency, 440.0);
    }

    #[test]
    fn test_collect_sorts_loudest_first() {
        let window = PianoRange::Full.frequency_window();
        let peaks = [
            peak(261.63, 40.0),
            peak(329.63, 80.0),
            peak(392.0, 60.0),
        ];

        let names: Vec<String> = collect_pitches(&peaks, &window)
            .into_iter()
            .map(|p| p.note_name)
            .collect();
        assert_eq!(names, vec!["E4", "G4", "C4"]);
    }

    #[test]
    fn test_collect_skips_rejected_before_dedup() {
        let window = FrequencyWindow::new(100.0, 500.0).unwrap();
        // 99.5 is rejected, so it cannot shadow 100.2.
        let peaks = [peak(99.5, 10.0), peak(100.2, 10.0)];
        let pitches = collect_pitches(&peaks, &window);
        assert_eq!(pitches.len(), 1);
        assert_eq!(pitches[0].frequency, 100.2);
    }

    #[test]
    fn test_no_two_pitches_too_close() {
        let window = PianoRange::Full.frequency_window();
        let peaks: Vec<Peak> = (0..200)
            .map(|i| peak(200.0 + i as f32 * 1.5, (i % 7) as f32))
            .collect();

        let pitches = collect_pitches(&peaks, &window);
        for (i, a) in pitches.iter().enumerate() {
            for b in pitches.iter().skip(i + 1) {
                assert!(
                    !is_near_duplicate(a.frequency, b.frequency)
                        && !is_near_duplicate(b.frequency, a.frequency),
                    "{} and {} too close",
                    a.frequency,
                    b.frequency
                );
            }
        }
    }
}
