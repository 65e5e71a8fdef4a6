//! Unified error types for djcue
//!
//! Error strategy:
//! - Analysis itself never fails: short or silent audio yields neutral values
//! - Buffer contract violations (zero sample rate, empty buffer): rejected at the boundary
//! - Per-file errors (decode, worker failure): recoverable, skip track and continue
//! - System errors (output, config): fatal, abort batch

use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, OGG, M4A";

/// Top-level error type for djcue operations
#[derive(Debug, Error)]
pub enum AnalyzeError {
    // =========================================================================
    // Contract violations - programming errors in the decoding layer
    // =========================================================================
    #[error("Invalid sample buffer: {0}")]
    InvalidInput(String),

    // =========================================================================
    // Recoverable errors - skip track, continue batch
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    #[error("Analysis unavailable for request {id}: {reason}")]
    WorkerFailed { id: u64, reason: String },

    // =========================================================================
    // Fatal errors - abort entire batch
    // =========================================================================
    #[error("Analysis workers have shut down")]
    WorkerDisconnected,

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for djcue operations
pub type Result<T> = std::result::Result<T, AnalyzeError>;

impl AnalyzeError {
    /// Returns true if this error is recoverable (should skip track, continue batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalyzeError::InvalidInput(_)
                | AnalyzeError::DecodeError { .. }
                | AnalyzeError::UnsupportedFormat { .. }
                | AnalyzeError::FileNotFound(_)
                | AnalyzeError::WorkerFailed { .. }
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AnalyzeError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        AnalyzeError::OutputError { path, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(AnalyzeError::decode_error("a.mp3", "bad header").is_recoverable());
        assert!(AnalyzeError::WorkerFailed { id: 3, reason: "panic".into() }.is_recoverable());
        assert!(!AnalyzeError::ConfigError("threads = 0".into()).is_recoverable());
        assert!(!AnalyzeError::WorkerDisconnected.is_recoverable());
    }

    #[test]
    fn test_output_error_permission_message() {
        let err = AnalyzeError::output_error(
            "/root/out.json",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().contains("Permission denied"));
    }
}
