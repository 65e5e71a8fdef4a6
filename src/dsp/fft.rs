//! Magnitude spectra for power-of-two frames
//!
//! Wraps a planned rustfft forward transform (radix-2/4 decimation for
//! power-of-two sizes) with a Hann window and reusable buffers, so one
//! analyzer allocates its scratch space once per call rather than per frame.
//!
//! # Frame Size Choices
//!
//! - **2048**: tempo, drop and feature work (~46ms at 44.1kHz, fine time resolution)
//! - **8192**: key detection (~5.4Hz bins, enough to separate semitones above ~80Hz)

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Reusable windowed FFT of a fixed power-of-two size
///
/// Not shared across threads: each analysis call owns its own instance.
pub struct SpectrumAnalyzer {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Plan a transform of `size` samples
    ///
    /// # Panics
    ///
    /// Panics if `size` is not a power of two (>= 2). Frame sizes are chosen by
    /// the caller; `AnalysisConfig::validate` rejects bad ones up front.
    pub fn new(size: usize) -> Self {
        assert!(
            size >= 2 && size.is_power_of_two(),
            "FFT size must be a power of two, got {}",
            size
        );

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            size,
            fft,
            window: hann_window(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
        }
    }

    /// Frame length in samples
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of magnitude bins produced (first half of the spectrum)
    pub fn num_bins(&self) -> usize {
        self.size / 2
    }

    /// Hann-windowed magnitude spectrum of `frame` into `out`
    ///
    /// `frame` must hold `size()` samples and `out` `num_bins()` values.
    pub fn magnitudes(&mut self, frame: &[f32], out: &mut [f32]) {
        debug_assert_eq!(frame.len(), self.size);
        for ((slot, &s), &w) in self.buffer.iter_mut().zip(frame).zip(&self.window) {
            *slot = Complex::new(s * w, 0.0);
        }
        self.transform(out);
    }

    /// Magnitude spectrum of `frame` without windowing
    pub fn magnitudes_unwindowed(&mut self, frame: &[f32], out: &mut [f32]) {
        debug_assert_eq!(frame.len(), self.size);
        for (slot, &s) in self.buffer.iter_mut().zip(frame) {
            *slot = Complex::new(s, 0.0);
        }
        self.transform(out);
    }

    fn transform(&mut self, out: &mut [f32]) {
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);
        // Real input: the upper half mirrors the lower half
        for (m, c) in out.iter_mut().zip(&self.buffer[..self.size / 2]) {
            *m = c.norm();
        }
    }
}

/// Magnitude spectrum (first half of bins) of a power-of-two buffer, unwindowed
pub fn magnitude_spectrum(samples: &[f32]) -> Vec<f32> {
    let mut analyzer = SpectrumAnalyzer::new(samples.len());
    let mut out = vec![0.0; analyzer.num_bins()];
    analyzer.magnitudes_unwindowed(samples, &mut out);
    out
}

/// Generate a symmetric Hann window: `0.5 * (1 - cos(2*pi*i / (N - 1)))`
pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Centre frequency of an FFT bin in Hz
pub fn bin_frequency(bin: usize, sample_rate: u32, fft_size: usize) -> f32 {
    bin as f32 * sample_rate as f32 / fft_size as f32
}
