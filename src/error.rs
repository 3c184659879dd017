//! Error types for STIG processing

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that abort a processing run
///
/// Per-rule failures are never represented here; those are recorded as
/// [`ProcessingError`](crate::processor::ProcessingError) entries on the
/// result and the batch continues.
#[derive(Error, Debug)]
pub enum Error {
    /// Input file could not be read
    #[error("failed to read input file {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file exceeds the size bound
    #[error("input file {path} is too large ({size} bytes, maximum allowed is {limit} bytes)")]
    InputTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// Input file is not valid STIG JSON
    #[error("failed to parse STIG JSON from {path}: {source}")]
    InputParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Unsupported output format string
    #[error("invalid output format: {value} (must be 'yaml' or 'json')")]
    InvalidFormat { value: String },

    /// Unsupported severity filter string
    #[error("invalid severity level: {value} (must be one of: low, medium, high)")]
    InvalidSeverity { value: String },

    /// Output directory could not be created
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory listing failed during output validation or fix loading
    #[error("failed to read directory {path}: {source}")]
    DirRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Automatable rules existed but every policy failed validation or writing
    #[error("expected to generate policies but none were created ({automatable} automatable rules)")]
    NoPoliciesProduced { automatable: usize },

    /// Write-class errors accumulated outside dry-run mode
    #[error("processing failed due to {count} file write errors")]
    WriteFailures { count: usize },

    /// YAML marshalling error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON marshalling error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
