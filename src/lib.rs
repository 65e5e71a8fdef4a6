//! djcue - audio analysis engine for DJ libraries
//!
//! Derives musical metadata from a decoded mono sample buffer: tempo (BPM),
//! Camelot key, a 1-10 energy score, a mood label, spectral features for
//! similarity, auto-tags, intro/outro boundaries and drop/build cue markers.
//!
//! # Architecture
//!
//! - `dsp`: windowed FFT magnitude spectra and frame extraction
//! - `analysis`: the individual analyzers, each total over a valid buffer
//! - `pipeline`: the aggregating `Engine`, the batch worker protocol and the CLI pipeline
//! - `config`: tunable analysis constants, CLI arguments and runtime settings
//! - `discovery`, `audio`, `export`: host-side file scanning, decoding and JSON output
//!
//! # Example
//!
//! ```no_run
//! use djcue::SampleBuffer;
//!
//! let samples = vec![0.0f32; 44100 * 30];
//! let buffer = SampleBuffer::new(&samples, 44100).expect("valid buffer");
//! let result = djcue::analyze(&buffer);
//! println!("{} BPM, key {}", result.bpm, result.key);
//! ```

pub mod analysis;
pub mod audio;
pub mod config;
pub mod discovery;
pub mod dsp;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod types;

// Re-export key types at crate root
pub use error::{AnalyzeError, Result};
pub use pipeline::Engine;
pub use types::{
    AnalysisResult, AudioBuffer, CamelotKey, CuePoint, CueSource, Mode, Mood, PitchClass,
    SampleBuffer, SpectralFeatures,
};

/// Run the full pipeline with default analysis constants
pub fn analyze(buffer: &SampleBuffer) -> AnalysisResult {
    Engine::default().analyze(buffer)
}
