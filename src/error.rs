//! Error types for Orbit.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Orbit operations.
pub type Result<T> = std::result::Result<T, OrbitError>;

/// Errors that can fail an Orbit call.
///
/// Everything that is not listed here (ambiguous names, unresolved
/// references, malformed directives) is recorded as a diagnostic instead.
#[derive(Error, Debug)]
pub enum OrbitError {
    /// The path does not map to any known source kind.
    #[error("Unrecognized source: {0}")]
    UnrecognizedSource(PathBuf),

    /// A source file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A scan glob was rejected by the walker.
    #[error("Invalid glob: {0}")]
    Glob(String),

    /// The file watcher could not be started.
    #[error("Watcher error: {0}")]
    Watch(String),
}

impl OrbitError {
    /// True for the one failure a driver should report back to the user.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, OrbitError::UnrecognizedSource(_))
    }
}
