//! Error types for the genre classification pipeline

use std::fmt;

/// Custom error type for genre classification processing
#[derive(Debug, Clone)]
pub enum GenreError {
    /// E001: Invalid audio format (e.g., non-PCM WAV)
    InvalidAudioFormat(String),
    /// E002: Unsupported sample rate
    UnsupportedSampleRate(u32),
    /// E003: Configuration validation failed
    ConfigValidationFailed(String),
    /// E004: Invalid configuration parameter
    InvalidConfigParameter(String),
    /// E005: Audio file I/O error
    AudioFileError(String),
    /// E006: STFT / spectrogram processing error
    SpectralProcessingError(String),
    /// E007: Slice image export error
    SliceExportError(String),
    /// E008: Genre directory missing or holds no slices
    DataNotFound(String),
    /// E009: Per-genre slice cap cannot be met
    InsufficientData(String),
    /// E010: Zero-size partition at accuracy-computation time
    EmptyDataset(String),
    /// E011: Checkpoint save/load failure
    CheckpointIo(String),
    /// E012: Model backend (training/inference) error
    ModelBackend(String),
    /// E013: Input validation error
    InputValidationError(String),
    /// E014: Report/plot export error
    ReportExportError(String),
}

impl fmt::Display for GenreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenreError::InvalidAudioFormat(msg) => {
                write!(f, "E001: Invalid audio format - {}", msg)
            }
            GenreError::UnsupportedSampleRate(sr) => {
                write!(f, "E002: Unsupported sample rate {} Hz", sr)
            }
            GenreError::ConfigValidationFailed(msg) => {
                write!(f, "E003: Configuration validation failed - {}", msg)
            }
            GenreError::InvalidConfigParameter(msg) => {
                write!(f, "E004: Invalid configuration parameter - {}", msg)
            }
            GenreError::AudioFileError(msg) => {
                write!(f, "E005: Audio file I/O error - {}", msg)
            }
            GenreError::SpectralProcessingError(msg) => {
                write!(f, "E006: Spectral processing error - {}", msg)
            }
            GenreError::SliceExportError(msg) => {
                write!(f, "E007: Slice export error - {}", msg)
            }
            GenreError::DataNotFound(msg) => {
                write!(f, "E008: Data not found - {}", msg)
            }
            GenreError::InsufficientData(msg) => {
                write!(f, "E009: Insufficient data - {}", msg)
            }
            GenreError::EmptyDataset(msg) => {
                write!(f, "E010: Empty dataset - {}", msg)
            }
            GenreError::CheckpointIo(msg) => {
                write!(f, "E011: Checkpoint I/O error - {}", msg)
            }
            GenreError::ModelBackend(msg) => {
                write!(f, "E012: Model backend error - {}", msg)
            }
            GenreError::InputValidationError(msg) => {
                write!(f, "E013: Input validation error - {}", msg)
            }
            GenreError::ReportExportError(msg) => {
                write!(f, "E014: Report export error - {}", msg)
            }
        }
    }
}

impl std::error::Error for GenreError {}

// From implementations for common error types
impl From<std::io::Error> for GenreError {
    fn from(err: std::io::Error) -> Self {
        GenreError::AudioFileError(format!("File I/O error: {}", err))
    }
}

impl From<serde_json::Error> for GenreError {
    fn from(err: serde_json::Error) -> Self {
        GenreError::ConfigValidationFailed(format!("JSON error: {}", err))
    }
}

impl From<image::ImageError> for GenreError {
    fn from(err: image::ImageError) -> Self {
        GenreError::SliceExportError(format!("Image error: {}", err))
    }
}

impl From<anyhow::Error> for GenreError {
    fn from(err: anyhow::Error) -> Self {
        GenreError::ConfigValidationFailed(format!("{}", err))
    }
}

// Note: tch errors are mapped at the call site so checkpoint failures can be
// told apart from training/inference failures.

/// Result type alias for genre classification operations
pub type Result<T> = std::result::Result<T, GenreError>;
