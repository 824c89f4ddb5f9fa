//! Error handling for Emotive
//!
//! Errors are grouped the way callers have to react to them: configuration
//! problems fail fast at setup, export problems go back to whoever asked for
//! the artifact. Inference failures never show up here; they are contained
//! in [`crate::neural::InferenceOutcome`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Emotive operations
pub type Result<T> = std::result::Result<T, EmotiveError>;

/// Main error type for Emotive operations
#[derive(Error, Debug)]
pub enum EmotiveError {
    // Configuration Errors
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Failed to read config file: {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown classifier: {id}")]
    UnknownClassifier { id: String },

    #[error("Failed to load icon for '{label}' from {path}: {reason}")]
    IconLoad {
        label: String,
        path: PathBuf,
        reason: String,
    },

    // Frame Errors
    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("Failed to decode frame {path}: {reason}")]
    FrameDecode { path: PathBuf, reason: String },

    // Pipeline Errors
    #[error("Pipeline runtime error: {reason}")]
    Runtime { reason: String },

    // Session Errors
    #[error("Failed to read session ledger: {path}: {source}")]
    LedgerRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Export Errors
    #[error("Failed to write export artifact: {path}: {source}")]
    ExportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create export directory: {path}: {source}")]
    ExportDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EmotiveError {
    /// Shorthand for a configuration error on `field`
    pub fn config(field: &str, reason: impl Into<String>) -> Self {
        EmotiveError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EmotiveError::InvalidConfig { .. } => "INVALID_CONFIG",
            EmotiveError::ConfigRead { .. } => "CONFIG_READ",
            EmotiveError::UnknownClassifier { .. } => "UNKNOWN_CLASSIFIER",
            EmotiveError::IconLoad { .. } => "ICON_LOAD",
            EmotiveError::InvalidFrame { .. } => "INVALID_FRAME",
            EmotiveError::FrameDecode { .. } => "FRAME_DECODE",
            EmotiveError::Runtime { .. } => "RUNTIME_ERROR",
            EmotiveError::LedgerRead { .. } => "LEDGER_READ",
            EmotiveError::ExportWrite { .. } => "EXPORT_WRITE",
            EmotiveError::ExportDirectory { .. } => "EXPORT_DIRECTORY",
            EmotiveError::Io(_) => "IO_ERROR",
            EmotiveError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable without restarting the session
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EmotiveError::IconLoad { .. }
                | EmotiveError::FrameDecode { .. }
                | EmotiveError::ExportWrite { .. }
                | EmotiveError::ExportDirectory { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            EmotiveError::InvalidConfig { .. } => vec![
                "Check the value against the documented range",
                "Sampling stride and inference size must be positive",
            ],
            EmotiveError::UnknownClassifier { .. } => {
                vec!["Run 'emotive-cli labels' to list registered classifiers"]
            }
            EmotiveError::IconLoad { .. } => vec![
                "The overlay will render without an icon for this label",
                "Check the icon path in the label-to-icon mapping",
            ],
            EmotiveError::ExportWrite { .. } | EmotiveError::ExportDirectory { .. } => vec![
                "Check that the output directory is writable",
                "Free up disk space",
                "Export to a different location",
            ],
            _ => vec![],
        }
    }
}
