//! Scan Error Types
//!
//! Errors that can occur while launching and supervising a scanner. The
//! runner converts all of them into a failed result; none of them stop the
//! remaining scans.

use std::io;
use std::path::PathBuf;

/// Result type alias for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Join tool names for display, showing empty names as `""`
fn display_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| {
            if name.is_empty() {
                "\"\"".to_string()
            } else {
                name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error types for scan operations
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// One or more tool names are not in the registry
    #[error("Invalid tools: {}", display_names(.0))]
    InvalidTools(Vec<String>),

    /// The output directory could not be created
    #[error("Failed to create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The orchestration CLI could not be started
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// A piped stream was not available on the child handle
    #[error("Child process has no {0} pipe")]
    MissingPipe(&'static str),

    /// Waiting for the child process failed
    #[error("Failed to wait for scanner process: {0}")]
    Wait(#[source] io::Error),
}
