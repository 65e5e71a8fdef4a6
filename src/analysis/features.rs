//! Frame-averaged spectral descriptors
//!
//! RMS and zero-crossing rate come from the raw frame, centroid and rolloff
//! from its Hann-windowed magnitude spectrum. The chroma vector uses the key
//! estimator's method over the whole buffer.

use crate::analysis::key::chroma_vector;
use crate::config::{FeatureConfig, KeyConfig};
use crate::dsp::{bin_frequency, for_each_frame, SpectrumAnalyzer};
use crate::types::{SampleBuffer, SpectralFeatures};
use tracing::debug;

/// Averaged features plus the per-frame RMS series the energy score needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureAnalysis {
    pub features: SpectralFeatures,
    pub frame_rms: Vec<f32>,
}

/// Extract averaged spectral features with default parameters
pub fn extract_features(buffer: &SampleBuffer) -> SpectralFeatures {
    analyze_features(buffer, &FeatureConfig::default(), &KeyConfig::default()).features
}

/// Extract averaged features and keep the frame RMS series
pub fn analyze_features(
    buffer: &SampleBuffer,
    config: &FeatureConfig,
    key_config: &KeyConfig,
) -> FeatureAnalysis {
    let sample_rate = buffer.sample_rate();
    let mut analyzer = SpectrumAnalyzer::new(config.fft_size);
    let frequencies: Vec<f32> = (0..analyzer.num_bins())
        .map(|bin| bin_frequency(bin, sample_rate, config.fft_size))
        .collect();

    let mut frame_rms = Vec::new();
    let mut sums = [0.0f64; 3]; // centroid, rolloff, zcr

    let num_frames = for_each_frame(buffer.samples(), &mut analyzer, config.hop_size, |_, frame, magnitudes| {
        frame_rms.push(rms(frame));
        sums[0] += spectral_centroid(magnitudes, &frequencies) as f64;
        sums[1] += spectral_rolloff(magnitudes, &frequencies, config.rolloff_fraction) as f64;
        sums[2] += zero_crossing_rate(frame) as f64;
    });

    let chroma = chroma_vector(buffer.samples(), sample_rate, key_config);

    if num_frames == 0 {
        debug!("Features: buffer shorter than one frame");
        return FeatureAnalysis {
            features: SpectralFeatures {
                chroma_vector: chroma,
                ..SpectralFeatures::default()
            },
            frame_rms,
        };
    }

    let n = num_frames as f64;
    let mean_rms = frame_rms.iter().map(|&r| r as f64).sum::<f64>() / n;
    let features = SpectralFeatures {
        centroid: (sums[0] / n) as f32,
        rolloff: (sums[1] / n) as f32,
        zero_crossing_rate: (sums[2] / n) as f32,
        rms: mean_rms as f32,
        chroma_vector: chroma,
    };
    debug!(
        "Features: centroid {:.0} Hz, rolloff {:.0} Hz, zcr {:.4}, rms {:.4} over {} frames",
        features.centroid, features.rolloff, features.zero_crossing_rate, features.rms, num_frames
    );

    FeatureAnalysis { features, frame_rms }
}

/// Root mean square of a frame
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f64 = frame.iter().map(|&s| s as f64 * s as f64).sum();
    (sum / frame.len() as f64).sqrt() as f32
}

/// Sign changes per sample
pub fn zero_crossing_rate(frame: &[f32]) -> f32 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}

/// Magnitude-weighted mean frequency, 0 for an empty spectrum
pub fn spectral_centroid(magnitudes: &[f32], frequencies: &[f32]) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f32 = magnitudes.iter().zip(frequencies).map(|(m, f)| m * f).sum();
    weighted / total
}

/// Frequency below which `fraction` of the spectral energy lies, 0 for an empty spectrum
pub fn spectral_rolloff(magnitudes: &[f32], frequencies: &[f32], fraction: f32) -> f32 {
    let total: f32 = magnitudes.iter().map(|m| m * m).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let target = fraction * total;
    let mut cumulative = 0.0f32;
    for (m, &f) in magnitudes.iter().zip(frequencies) {
        cumulative += m * m;
        if cumulative >= target {
            return f;
        }
    }
    frequencies.last().copied().unwrap_or(0.0)
}
