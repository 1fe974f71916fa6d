//! Recoverable error types
//!
//! Shape and call-order violations are programmer errors and panic where they
//! are detected. Everything that depends on a file or a configuration document
//! is reported through [`NetworkError`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fallible network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors raised while loading, saving or configuring networks.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The parameter file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// A named field of a parameter document is missing, ill-typed or mis-sized.
    #[error("invalid data in field '{field}'")]
    InvalidData { field: String },

    /// A training or architecture configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A parameter snapshot does not fit the network it is restored into.
    #[error("parameter count mismatch for layer {layer}: expected {expected}, got {actual}")]
    ParameterCountMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NetworkError {
    #[must_use]
    pub fn invalid_data(field: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Maps a failed file open to `FileNotFound` when the file is missing.
    pub(crate) fn from_open(error: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path: path.into() }
        } else {
            Self::Io(error)
        }
    }
}
