//! Signal-processing building blocks shared by the analyzers
//!
//! - `fft`: windowed magnitude spectra over power-of-two frames
//! - `frames`: overlapping frame extraction feeding the FFT

pub mod fft;
pub mod frames;

pub use fft::{bin_frequency, hann_window, magnitude_spectrum, SpectrumAnalyzer};
pub use frames::{for_each_frame, frame_count};
