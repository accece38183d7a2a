//! Error types for loading, joining and writing documents.

use std::path::PathBuf;

use apijoin_core::JoinError;
use thiserror::Error;

/// Errors that can occur while loading inputs or writing results.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The join itself failed.
    #[error(transparent)]
    JoinError(#[from] JoinError),

    /// A file is not valid UTF-8 text.
    #[error("{path}: invalid UTF-8: {source}")]
    InvalidUtf8 {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    /// A file parsed but is not a Swagger 2.0 or OpenAPI 3.x document.
    #[error("{path}: not an API description document: {reason}")]
    UnsupportedDocument { path: PathBuf, reason: String },

    /// A job or directory produced no documents to join.
    #[error("no input documents")]
    NoDocuments,
}

/// Convenience alias for results with [`LoaderError`].
pub type Result<T> = std::result::Result<T, LoaderError>;
