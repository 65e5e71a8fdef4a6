//! Analysis trait abstractions
//!
//! These traits define the interface for swappable tempo and key backends.
//! The engine holds them as trait objects so a caller can plug in a different
//! estimator without touching pipeline code.

use crate::types::{CamelotKey, SampleBuffer};

/// BPM detection backend
pub trait BpmDetector: Send + Sync {
    /// Detect tempo from audio samples; 0 when no estimate is possible
    fn detect(&self, buffer: &SampleBuffer) -> u32;

    /// Get the name of this detector (for logging)
    fn name(&self) -> &'static str;
}

/// Musical key detection backend
pub trait KeyDetector: Send + Sync {
    /// Detect musical key from audio samples; `CamelotKey::Unknown` when no estimate is possible
    fn detect(&self, buffer: &SampleBuffer) -> CamelotKey;

    /// Get the name of this detector (for logging)
    fn name(&self) -> &'static str;
}
