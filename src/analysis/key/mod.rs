//! Key detection module
//!
//! Chroma accumulation over a centred segment, matched against rotated
//! Krumhansl-Schmuckler profiles with Pearson correlation.

pub mod camelot;

use crate::analysis::traits::KeyDetector;
use crate::config::KeyConfig;
use crate::dsp::{bin_frequency, for_each_frame, SpectrumAnalyzer};
use crate::types::{CamelotKey, Mode, PitchClass, SampleBuffer};
use tracing::debug;

/// Krumhansl-Schmuckler major profile, tonic first
pub const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Schmuckler minor profile, tonic first
pub const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Profile-correlation key detector
#[derive(Debug, Clone, Default)]
pub struct ChromaKeyDetector {
    config: KeyConfig,
}

impl ChromaKeyDetector {
    pub fn new(config: KeyConfig) -> Self {
        Self { config }
    }

    pub fn estimate(&self, buffer: &SampleBuffer) -> CamelotKey {
        let segment = centred_segment(buffer, self.config.segment_secs);
        let (chroma, frames) = accumulate_chroma(segment, buffer.sample_rate(), &self.config);

        if frames == 0 {
            debug!("Key: segment of {} samples yields no frames", segment.len());
            return CamelotKey::Unknown;
        }
        let Some(chroma) = normalize_chroma(chroma) else {
            debug!("Key: silent segment");
            return CamelotKey::Unknown;
        };

        let (pitch, mode, score) = best_profile_match(&chroma);
        let key = camelot::to_camelot(pitch, mode);
        debug!(
            "Key: {} ({}{}, r = {:.3}, {} frames)",
            key,
            pitch.to_standard_notation(),
            if mode == Mode::Minor { "m" } else { "" },
            score,
            frames
        );
        key
    }
}

impl KeyDetector for ChromaKeyDetector {
    fn detect(&self, buffer: &SampleBuffer) -> CamelotKey {
        self.estimate(buffer)
    }

    fn name(&self) -> &'static str {
        "chroma-krumhansl"
    }
}

/// Estimate key with default parameters
pub fn detect_key(buffer: &SampleBuffer) -> CamelotKey {
    ChromaKeyDetector::default().estimate(buffer)
}

/// Whole-buffer chroma vector, max bin = 1 (all zero when silent or too short)
pub fn chroma_vector(samples: &[f32], sample_rate: u32, config: &KeyConfig) -> [f32; 12] {
    let (chroma, _) = accumulate_chroma(samples, sample_rate, config);
    normalize_chroma(chroma).unwrap_or([0.0; 12])
}

/// Up to `segment_secs` of audio centred in the buffer
fn centred_segment<'a>(buffer: &SampleBuffer<'a>, segment_secs: f64) -> &'a [f32] {
    let samples = buffer.samples();
    let segment_len = (segment_secs * buffer.sample_rate() as f64) as usize;
    if segment_len == 0 || samples.len() <= segment_len {
        return samples;
    }
    let start = (samples.len() - segment_len) / 2;
    &samples[start..start + segment_len]
}

/// Sum of squared magnitudes per pitch class, plus the number of frames analysed
fn accumulate_chroma(samples: &[f32], sample_rate: u32, config: &KeyConfig) -> ([f32; 12], usize) {
    let mut chroma = [0.0f32; 12];
    if samples.len() < config.fft_size {
        return (chroma, 0);
    }

    let mut analyzer = SpectrumAnalyzer::new(config.fft_size);
    let bin_classes = pitch_class_map(analyzer.num_bins(), sample_rate, config);

    let frames = for_each_frame(samples, &mut analyzer, config.hop_size, |_, _, magnitudes| {
        for (magnitude, class) in magnitudes.iter().zip(&bin_classes) {
            if let Some(class) = class {
                chroma[*class] += magnitude * magnitude;
            }
        }
    });

    (chroma, frames)
}

/// Pitch class for every bin inside the configured chroma band
fn pitch_class_map(num_bins: usize, sample_rate: u32, config: &KeyConfig) -> Vec<Option<usize>> {
    (0..num_bins)
        .map(|bin| {
            let freq = bin_frequency(bin, sample_rate, config.fft_size);
            if freq < config.min_freq_hz || freq > config.max_freq_hz {
                return None;
            }
            let midi = (69.0 + 12.0 * (freq / config.reference_a4_hz).log2()).round() as i32;
            Some(midi.rem_euclid(12) as usize)
        })
        .collect()
}

fn normalize_chroma(mut chroma: [f32; 12]) -> Option<[f32; 12]> {
    let max = chroma.iter().copied().fold(0.0f32, f32::max);
    if !(max > 0.0) {
        return None;
    }
    for value in chroma.iter_mut() {
        *value /= max;
    }
    Some(chroma)
}

/// Best (tonic, mode) over all 24 profile rotations; ties keep the first (major before minor, C first)
fn best_profile_match(chroma: &[f32; 12]) -> (PitchClass, Mode, f32) {
    let mut best = (PitchClass::C, Mode::Major, f32::NEG_INFINITY);
    for (mode, profile) in [(Mode::Major, &MAJOR_PROFILE), (Mode::Minor, &MINOR_PROFILE)] {
        for tonic in 0..12 {
            let rotated: [f32; 12] = std::array::from_fn(|p| profile[(p + 12 - tonic) % 12]);
            let score = pearson(chroma, &rotated);
            if score > best.2 {
                best = (PitchClass::from_index(tonic), mode, score);
            }
        }
    }
    best
}

/// Pearson correlation, 0 when either side has no variance
fn pearson(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let n = a.len() as f64;
    let mean_a = a.iter().map(|&x| x as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&x| x as f64).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom > 0.0 {
        (cov / denom) as f32
    } else {
        0.0
    }
}
