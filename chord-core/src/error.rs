//! Error types for the chord detection core.
//!
//! Ordinary analysis outcomes (silence, no qualifying peak, a low-confidence
//! match) are never errors; they surface as empty results. The variants here
//! cover construction, configuration and the I/O around the pipeline.

/// Result type alias for chord-core operations.
pub type Result<T> = std::result::Result<T, ChordError>;

/// Errors raised by the chord detection core.
#[derive(Debug, thiserror::Error)]
pub enum ChordError {
    /// The transform length is zero, too small, or not a power of two.
    #[error("Invalid transform size {0}: must be a power of two of at least 4")]
    InvalidTransformSize(usize),

    /// A frequency window with non-finite, non-positive or inverted bounds.
    #[error("Invalid frequency window: min={min} Hz, max={max} Hz")]
    InvalidFrequencyWindow { min: f32, max: f32 },

    /// A sample rate of zero.
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// A block queue without capacity.
    #[error("Invalid queue depth: {0}")]
    InvalidQueueDepth(usize),

    /// Settings file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings (de)serialization failure.
    #[error("Settings format error: {0}")]
    Json(#[from] serde_json::Error),

    /// Audio device or stream failure.
    #[error("Audio error: {0}")]
    Audio(String),

    /// The analysis worker is no longer running.
    #[error("Analysis worker stopped")]
    WorkerStopped,
}
