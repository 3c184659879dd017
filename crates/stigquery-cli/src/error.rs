//! Error types for the stigquery CLI

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Input benchmark file not found
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Processing pipeline error
    #[error(transparent)]
    Processing(#[from] stigquery::Error),

    /// Policy files on disk failed validation
    #[error("Validation failed: {count} invalid policy file(s)")]
    InvalidPolicies { count: usize },

    /// Fix directory not found or unreadable
    #[error("Fix directory not found: {path}")]
    FixDirNotFound { path: PathBuf },

    /// File write error
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
