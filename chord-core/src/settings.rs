//! # Settings Module
//!
//! User-facing configuration for a listening session, saved to and loaded
//! from a JSON file.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{ChordError, Result},
    fft::DEFAULT_TRANSFORM_SIZE,
    tuning::{FrequencyWindow, Instrument},
};

/// Configuration for the detector, capture and worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Instrument preset selecting the frequency window.
    pub instrument: Instrument,
    /// FFT length and capture block size (power of two).
    pub transform_size: usize,
    /// Capture sample rate requested from the input device.
    pub sample_rate: u32,
    /// Number of blocks the worker queue holds before capture drops new ones.
    pub queue_depth: usize,
    /// Chords below this confidence are not printed.
    pub min_display_confidence: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            instrument: Instrument::default(),
            transform_size: DEFAULT_TRANSFORM_SIZE,
            sample_rate: 44100,
            queue_depth: 4,
            min_display_confidence: 0.5,
        }
    }
}

impl Settings {
    /// The frequency window selected by the instrument preset.
    pub fn frequency_window(&self) -> FrequencyWindow {
        self.instrument.frequency_window()
    }

    /// Checks the values that would otherwise fail later at start-up.
    pub fn validate(&self) -> Result<()> {
        if self.transform_size < 4 || !self.transform_size.is_power_of_two() {
            return Err(ChordError::InvalidTransformSize(self.transform_size));
        }
        if self.sample_rate == 0 {
            return Err(ChordError::InvalidSampleRate(self.sample_rate));
        }
        if self.queue_depth == 0 {
            return Err(ChordError::InvalidQueueDepth(self.queue_depth));
        }
        Ok(())
    }

    /// Loads and validates settings from a JSON file. Missing fields take
    /// their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let settings: Settings = serde_json::from_str(&data)?;
        settings.validate()?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Saves the settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::PianoRange;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.transform_size, 4096);
        assert_eq!(settings.instrument, Instrument::Guitar);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.frequency_window().min(), 50.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            instrument: Instrument::Piano {
                range: PianoRange::Bass,
            },
            transform_size: 8192,
            ..Default::default()
        };

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "instrument": { "kind": "piano", "range": "treble" } }"#,
        )
        .unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(
            loaded.instrument,
            Instrument::Piano {
                range: PianoRange::Treble
            }
        );
        assert_eq!(loaded.transform_size, 4096);
        assert_eq!(loaded.queue_depth, 4);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "transform_size": 1000 }"#).unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(ChordError::InvalidTransformSize(1000))
        ));

        let settings = Settings {
            queue_depth: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ChordError::InvalidQueueDepth(0))
        ));
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Settings::load(dir.path().join("absent.json")),
            Err(ChordError::Io(_))
        ));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(ChordError::Json(_))));
    }
}
