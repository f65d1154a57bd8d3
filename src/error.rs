//! Error types for the audioval library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum AudioValError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid session file name(s): {0}")]
    InvalidFileName(String),

    #[error("Audio file name '{file}' has fewer than 5 underscore-delimited tokens")]
    MalformedAudioFileName { file: String },

    #[error("Unknown comparison label '{0}'")]
    UnknownComparisonLabel(String),

    #[error("Subject '{0}' has no target entry to assign a form factor from")]
    UnassignableSubject(String),

    #[error(
        "No reference row for subject '{subject}' (form factor '{form_factor}', {freq} Hz) \
         to difference against"
    )]
    MissingTarget {
        subject: String,
        form_factor: String,
        freq: u32,
    },

    #[error(
        "Duplicate rows for subject '{subject}', form factor '{form_factor}', {freq} Hz \
         make pairing ambiguous"
    )]
    AmbiguousPairing {
        subject: String,
        form_factor: String,
        freq: u32,
    },

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Invalid score value '{value}' at row {row}, column '{column}'")]
    InvalidScore {
        value: String,
        row: usize,
        column: String,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, AudioValError>;
