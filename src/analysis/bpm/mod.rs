//! Tempo (BPM) estimation
//!
//! Pipeline:
//! 1. Spectral flux onset envelope (half-wave rectified magnitude increase per frame)
//! 2. Global autocorrelation over lags covering 30-300 BPM, normalized by its maximum
//! 3. Score = log(1 + gain * autocorr) + log-normal tempo prior centred on 120 BPM
//! 4. Parabolic refinement of the winning lag
//! 5. Octave folding into the "felt tempo" range (60-150 BPM)
//!
//! Returns 0 when the buffer is too short for a usable lag range, or when its
//! strongest onset is negligible next to its loudest frame (silence, steady tones).

use crate::analysis::traits::BpmDetector;
use crate::config::TempoConfig;
use crate::dsp::{for_each_frame, frame_count, SpectrumAnalyzer};
use crate::types::SampleBuffer;
use tracing::debug;

/// Autocorrelation-based tempo estimator
#[derive(Debug, Clone, Default)]
pub struct TempoEstimator {
    config: TempoConfig,
}

impl TempoEstimator {
    pub fn new(config: TempoConfig) -> Self {
        Self { config }
    }

    /// Estimate the tempo in whole BPM, 0 if no estimate is possible
    pub fn estimate(&self, buffer: &SampleBuffer) -> u32 {
        let cfg = &self.config;
        let (envelope, peak_level) = onset_envelope_with_level(buffer.samples(), cfg.fft_size, cfg.hop_size);

        if envelope.len() < cfg.min_envelope_frames {
            debug!(
                "Onset envelope too short for tempo ({} frames, need {})",
                envelope.len(),
                cfg.min_envelope_frames
            );
            return 0;
        }

        let strongest = envelope.iter().copied().fold(0.0f32, f32::max);
        if !(strongest > cfg.min_onset_ratio * peak_level) {
            debug!(
                "No onsets above the noise floor (strongest {:.3e}, frame level {:.3e})",
                strongest, peak_level
            );
            return 0;
        }

        let frames_per_second = buffer.sample_rate() as f32 / cfg.hop_size as f32;
        let envelope = smooth_envelope(&envelope);

        let Some(lag) = self.best_lag(&envelope, frames_per_second) else {
            return 0;
        };

        let raw_bpm = 60.0 * frames_per_second / lag;
        let bpm = fold_tempo(raw_bpm, cfg.fold_min_bpm, cfg.fold_max_bpm);
        debug!("Tempo: lag {:.3} frames -> {:.2} BPM, folded {:.2}", lag, raw_bpm, bpm);

        bpm.round() as u32
    }

    /// Refined autocorrelation lag (in frames) of the most plausible beat period
    fn best_lag(&self, envelope: &[f32], frames_per_second: f32) -> Option<f32> {
        let cfg = &self.config;
        let n = envelope.len();

        let min_lag = ((60.0 * frames_per_second / cfg.max_search_bpm).ceil() as usize).max(1);
        // Leave one lag of headroom for the parabolic neighbour
        let max_lag = ((60.0 * frames_per_second / cfg.min_search_bpm).floor() as usize)
            .min(n.saturating_sub(2));

        if min_lag >= max_lag {
            debug!("Tempo lag range inverted ({}..{}), too few frames", min_lag, max_lag);
            return None;
        }

        let acf = autocorrelation(envelope, max_lag + 1);
        let peak = acf[min_lag..=max_lag].iter().copied().fold(0.0f32, f32::max);
        if !(peak > 0.0) {
            return None;
        }

        let mut best_lag = min_lag;
        let mut best_score = f32::NEG_INFINITY;
        for lag in min_lag..=max_lag {
            let normalized = acf[lag] / peak;
            let bpm = 60.0 * frames_per_second / lag as f32;
            let score = (1.0 + cfg.autocorr_gain * normalized).ln()
                + log_tempo_prior(bpm, cfg.prior_center_bpm, cfg.prior_width_octaves);
            if score > best_score {
                best_score = score;
                best_lag = lag;
            }
        }

        let offset = parabolic_offset(acf[best_lag - 1], acf[best_lag], acf[best_lag + 1]);
        Some(best_lag as f32 + offset)
    }
}

impl BpmDetector for TempoEstimator {
    fn detect(&self, buffer: &SampleBuffer) -> u32 {
        self.estimate(buffer)
    }

    fn name(&self) -> &'static str {
        "spectral-flux-autocorrelation"
    }
}

/// Estimate tempo with default parameters
pub fn detect_bpm(buffer: &SampleBuffer) -> u32 {
    TempoEstimator::default().estimate(buffer)
}

/// Spectral flux per frame transition
///
/// `flux[f] = sum(max(0, mag[f][bin] - mag[f-1][bin]))` over every bin but DC;
/// one value per pair of consecutive frames.
pub fn onset_envelope(samples: &[f32], fft_size: usize, hop_size: usize) -> Vec<f32> {
    onset_envelope_with_level(samples, fft_size, hop_size).0
}

/// Onset envelope plus the largest per-frame magnitude sum, the reference for
/// the onset noise floor
fn onset_envelope_with_level(samples: &[f32], fft_size: usize, hop_size: usize) -> (Vec<f32>, f32) {
    let num_frames = frame_count(samples.len(), fft_size, hop_size);
    if num_frames < 2 {
        return (Vec::new(), 0.0);
    }

    let mut analyzer = SpectrumAnalyzer::new(fft_size);
    let mut previous = vec![0.0f32; analyzer.num_bins()];
    let mut envelope = Vec::with_capacity(num_frames - 1);
    let mut peak_level = 0.0f32;

    // A low tone beating against its mirror image makes the DC bin pulse
    for_each_frame(samples, &mut analyzer, hop_size, |index, _, magnitudes| {
        let magnitudes = &magnitudes[1..];
        peak_level = peak_level.max(magnitudes.iter().sum());
        if index > 0 {
            envelope.push(spectral_flux(&previous[1..], magnitudes));
        }
        previous[1..].copy_from_slice(magnitudes);
    });

    (envelope, peak_level)
}

/// Half-wave rectified magnitude increase between two spectra
pub fn spectral_flux(previous: &[f32], current: &[f32]) -> f32 {
    current
        .iter()
        .zip(previous)
        .map(|(cur, prev)| (cur - prev).max(0.0))
        .sum()
}

/// 3-tap [0.25, 0.5, 0.25] smoothing so onsets jittered across two hops still
/// reinforce a single autocorrelation peak
fn smooth_envelope(envelope: &[f32]) -> Vec<f32> {
    let n = envelope.len();
    (0..n)
        .map(|i| {
            let left = if i > 0 { envelope[i - 1] } else { 0.0 };
            let right = if i + 1 < n { envelope[i + 1] } else { 0.0 };
            0.25 * left + 0.5 * envelope[i] + 0.25 * right
        })
        .collect()
}

/// Raw autocorrelation for lags `0..=max_lag`
fn autocorrelation(envelope: &[f32], max_lag: usize) -> Vec<f32> {
    (0..=max_lag)
        .map(|lag| {
            envelope
                .iter()
                .zip(&envelope[lag..])
                .map(|(a, b)| *a as f64 * *b as f64)
                .sum::<f64>() as f32
        })
        .collect()
}

/// Log of a log-normal tempo density (up to a constant)
fn log_tempo_prior(bpm: f32, center_bpm: f32, width_octaves: f32) -> f32 {
    let octaves = (bpm / center_bpm).log2() / width_octaves;
    -0.5 * octaves * octaves
}

/// Vertex offset of the parabola through three equally spaced samples, in [-0.5, 0.5]
fn parabolic_offset(left: f32, centre: f32, right: f32) -> f32 {
    let curvature = left - 2.0 * centre + right;
    if curvature >= 0.0 {
        return 0.0;
    }
    (0.5 * (left - right) / curvature).clamp(-0.5, 0.5)
}

/// Halve or double until the tempo lies within `[min_bpm, max_bpm]`
///
/// The range must span at least one octave. Non-positive input folds to 0.
pub fn fold_tempo(bpm: f32, min_bpm: f32, max_bpm: f32) -> f32 {
    if !bpm.is_finite() || bpm <= 0.0 {
        return 0.0;
    }
    let mut folded = bpm;
    while folded < min_bpm {
        folded *= 2.0;
    }
    while folded > max_bpm {
        folded /= 2.0;
    }
    folded
}
