//! Error handling for slicekit
//!
//! Every pipeline stage either returns a best-effort result or fails fast
//! with one of these variants. Errors carry recovery suggestions so a host
//! can present them without knowing the stage that raised them.

use thiserror::Error;

/// Result type alias for slicekit operations
pub type Result<T> = std::result::Result<T, SlicerError>;

/// Main error type for slicekit operations
#[derive(Error, Debug)]
pub enum SlicerError {
    // Session Errors
    #[error("No recording loaded")]
    NoInputLoaded,

    #[error("Operation cancelled")]
    Cancelled,

    // Analysis Errors
    #[error("Input is silent (peak is 0)")]
    SilentInput,

    #[error("No onsets detected")]
    NoOnsetsDetected,

    // Codec / Container Errors
    #[error("Format error: {reason}")]
    Format {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // File Errors
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SlicerError {
    /// Build a `Format` error without an underlying cause
    pub fn format(reason: impl Into<String>) -> Self {
        SlicerError::Format {
            reason: reason.into(),
            source: None,
        }
    }

    /// Build an `InvalidInput` error
    pub fn invalid(reason: impl Into<String>) -> Self {
        SlicerError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SlicerError::NoInputLoaded => "NO_INPUT_LOADED",
            SlicerError::Cancelled => "CANCELLED",
            SlicerError::SilentInput => "SILENT_INPUT",
            SlicerError::NoOnsetsDetected => "NO_ONSETS_DETECTED",
            SlicerError::Format { .. } => "FORMAT_ERROR",
            SlicerError::InvalidInput { .. } => "INVALID_INPUT",
            SlicerError::FileNotFound { .. } => "FILE_NOT_FOUND",
            SlicerError::Io(_) => "IO_ERROR",
            SlicerError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the user can correct this condition and retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SlicerError::NoInputLoaded
                | SlicerError::Cancelled
                | SlicerError::NoOnsetsDetected
                | SlicerError::InvalidInput { .. }
                | SlicerError::FileNotFound { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SlicerError::NoInputLoaded => vec!["Load a recording before slicing or exporting"],
            SlicerError::SilentInput => vec![
                "The recording contains only digital silence",
                "Check that the correct file was loaded",
            ],
            SlicerError::NoOnsetsDetected => vec![
                "Lower the threshold multiplier to increase sensitivity",
                "Use equal-division slicing instead",
                "Place markers manually",
            ],
            SlicerError::Format { .. } => vec![
                "The file may be truncated or corrupted - try re-exporting it",
                "Only uncompressed PCM WAV and DWP3 containers are supported",
            ],
            SlicerError::InvalidInput { .. } => vec!["Check the parameter values and try again"],
            SlicerError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            _ => vec![],
        }
    }
}
