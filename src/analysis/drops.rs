//! Drop and build detection
//!
//! Four band energies (sub-bass, bass, mid, high) are tracked per frame. Each
//! band's half-wave rectified flux is compared against a local robust
//! threshold (median + k * MAD over a sliding window), raised to a noise floor
//! relative to the loudest frame. Bass-weighted excess
//! marks a drop; mid/high excess over a quiet low end marks a build. The best
//! candidates are picked greedily under a minimum time gap.

use crate::config::DropConfig;
use crate::dsp::{bin_frequency, for_each_frame, frame_count, SpectrumAnalyzer};
use crate::types::{CueSource, CuePoint, SampleBuffer};
use std::cmp::Ordering;
use tracing::debug;

const NUM_BANDS: usize = 4;
const SUB: usize = 0;
const BASS: usize = 1;
const MID: usize = 2;
const HIGH: usize = 3;

/// Kind of structural marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Drop,
    Build,
}

impl MarkerKind {
    pub fn label(self) -> &'static str {
        match self {
            MarkerKind::Drop => "Drop",
            MarkerKind::Build => "Build",
        }
    }

    fn source(self) -> CueSource {
        match self {
            MarkerKind::Drop => CueSource::AutoDrop,
            MarkerKind::Build => CueSource::AutoBuild,
        }
    }
}

/// A frame whose flux cleared the adaptive threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Seconds from the start of the buffer
    pub time: f64,
    pub score: f32,
    pub kind: MarkerKind,
}

/// Detect drop/build cue markers with the given parameters
///
/// Returns at most `max_markers` cue points, ascending by position, at least
/// `min_gap_secs` apart, with IDs counting up from `first_cue_id`.
pub fn detect_drops_with(buffer: &SampleBuffer, config: &DropConfig) -> Vec<CuePoint> {
    let num_frames = frame_count(buffer.len(), config.fft_size, config.hop_size);
    if num_frames < config.min_frames.max(2) {
        debug!("Drops: {} frames, need {}", num_frames, config.min_frames);
        return Vec::new();
    }

    let energies = band_energies(buffer, config);
    let flux: Vec<Vec<f32>> = energies.iter().map(|band| band_flux(band)).collect();

    let frames_per_second = buffer.sample_rate() as f64 / config.hop_size as f64;
    let half_window = (config.threshold_window_secs * frames_per_second).round() as usize;
    let thresholds: Vec<Vec<f32>> = flux
        .iter()
        .map(|band| adaptive_threshold(band, half_window, config.mad_multiplier))
        .collect();

    let peak_energy = (0..energies[SUB].len())
        .map(|i| energies.iter().map(|band| band[i]).sum::<f32>())
        .fold(0.0f32, f32::max);
    let floor = config.noise_floor * peak_energy;

    let mut candidates = Vec::new();
    for i in 0..flux[SUB].len() {
        let frame_flux: [f32; NUM_BANDS] = std::array::from_fn(|b| flux[b][i]);
        let frame_threshold: [f32; NUM_BANDS] = std::array::from_fn(|b| thresholds[b][i].max(floor));
        if let Some((kind, score)) = score_frame(&frame_flux, &frame_threshold, config) {
            // Flux index i compares frames i and i + 1
            let frame = i + 1;
            candidates.push(Candidate {
                time: (frame * config.hop_size) as f64 / buffer.sample_rate() as f64,
                score,
                kind,
            });
        }
    }

    let selected = select_markers(candidates, config.min_gap_secs, config.max_markers);
    debug!("Drops: {} markers selected", selected.len());

    selected
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| CuePoint {
            id: config.first_cue_id + index as u32,
            position: candidate.time,
            label: candidate.kind.label().to_string(),
            color: match candidate.kind {
                MarkerKind::Drop => config.drop_color.clone(),
                MarkerKind::Build => config.build_color.clone(),
            },
            source: candidate.kind.source(),
        })
        .collect()
}

/// Detect drop/build cue markers with default parameters
pub fn detect_drops(buffer: &SampleBuffer) -> Vec<CuePoint> {
    detect_drops_with(buffer, &DropConfig::default())
}

/// Per-band energy (sum of squared magnitudes) for every frame
fn band_energies(buffer: &SampleBuffer, config: &DropConfig) -> [Vec<f32>; NUM_BANDS] {
    let mut analyzer = SpectrumAnalyzer::new(config.fft_size);
    let band_of_bin: Vec<Option<usize>> = (0..analyzer.num_bins())
        .map(|bin| {
            let freq = bin_frequency(bin, buffer.sample_rate(), config.fft_size);
            config.band_edges_hz.iter().rposition(|&edge| freq >= edge)
        })
        .collect();

    let mut energies: [Vec<f32>; NUM_BANDS] = Default::default();
    for_each_frame(buffer.samples(), &mut analyzer, config.hop_size, |_, _, magnitudes| {
        let mut frame = [0.0f32; NUM_BANDS];
        for (magnitude, band) in magnitudes.iter().zip(&band_of_bin) {
            if let Some(band) = band {
                frame[*band] += magnitude * magnitude;
            }
        }
        for (series, energy) in energies.iter_mut().zip(frame) {
            series.push(energy);
        }
    });
    energies
}

/// Half-wave rectified difference between consecutive frames
fn band_flux(energy: &[f32]) -> Vec<f32> {
    energy.windows(2).map(|w| (w[1] - w[0]).max(0.0)).collect()
}

/// Sliding `median + multiplier * MAD` over `[i - half_window, i + half_window]`
pub fn adaptive_threshold(values: &[f32], half_window: usize, multiplier: f32) -> Vec<f32> {
    let mut window = Vec::with_capacity(2 * half_window + 1);
    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(half_window);
            let end = (i + half_window + 1).min(values.len());

            window.clear();
            window.extend_from_slice(&values[start..end]);
            let median = median_in_place(&mut window);

            for value in window.iter_mut() {
                *value = (*value - median).abs();
            }
            let mad = median_in_place(&mut window);

            median + multiplier * mad
        })
        .collect()
}

/// Median of a non-empty slice (mean of the middle pair for even lengths); reorders the slice
fn median_in_place(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Drop and build scores for one frame; the larger positive one wins, drop on ties
pub fn score_frame(
    flux: &[f32; NUM_BANDS],
    threshold: &[f32; NUM_BANDS],
    config: &DropConfig,
) -> Option<(MarkerKind, f32)> {
    let excess: [f32; NUM_BANDS] = std::array::from_fn(|b| (flux[b] - threshold[b]).max(0.0));

    let drop_score: f32 = excess
        .iter()
        .zip(&config.band_weights)
        .map(|(e, w)| e * w)
        .sum();

    let quiet_low_end = flux[SUB] < config.build_bass_ratio * threshold[SUB]
        && flux[BASS] < config.build_bass_ratio * threshold[BASS];
    let build_score = if quiet_low_end {
        config.build_weights[0] * excess[MID] + config.build_weights[1] * excess[HIGH]
    } else {
        0.0
    };

    if drop_score > 0.0 && drop_score >= build_score {
        Some((MarkerKind::Drop, drop_score))
    } else if build_score > 0.0 {
        Some((MarkerKind::Build, build_score))
    } else {
        None
    }
}

/// Greedy pick by descending score under a minimum gap, returned in time order
pub fn select_markers(mut candidates: Vec<Candidate>, min_gap_secs: f64, max_markers: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal))
    });

    let mut selected: Vec<Candidate> = Vec::with_capacity(max_markers);
    for candidate in candidates {
        if selected.len() >= max_markers {
            break;
        }
        if selected
            .iter()
            .all(|s| (s.time - candidate.time).abs() >= min_gap_secs)
        {
            selected.push(candidate);
        }
    }

    selected.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic white noise in [-1, 1]
    fn noise(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 23) as f32 - 1.0
            })
            .collect()
    }

    fn assert_marker_invariants(drops: &[CuePoint]) {
        assert!(drops.len() <= 8, "too many markers: {}", drops.len());
        for pair in drops.windows(2) {
            assert!(pair[0].position < pair[1].position, "not ascending");
            assert!(pair[1].position - pair[0].position >= 8.0, "markers closer than 8 s");
        }
        let mut ids: Vec<u32> = drops.iter().map(|d| d.id).collect();
        assert!(ids.iter().all(|&id| id >= 100));
        ids.dedup();
        assert_eq!(ids.len(), drops.len(), "duplicate ids");
    }

    #[test]
    fn test_bass_entry_is_a_drop() {
        let sr = 44100;
        let mut samples = vec![0.0f32; sr * 30];
        let hats = noise(samples.len(), 7);
        for (i, sample) in samples.iter_mut().enumerate() {
            let t = i as f32 / sr as f32;
            *sample = 0.02 * hats[i];
            if t >= 16.0 {
                *sample += 0.8 * (2.0 * std::f32::consts::PI * 55.0 * t).sin();
            }
        }
        let buffer = SampleBuffer::new(&samples, sr as u32).unwrap();
        let drops = detect_drops(&buffer);

        assert_marker_invariants(&drops);
        let hit = drops
            .iter()
            .find(|d| (d.position - 16.0).abs() < 0.5)
            .expect("expected a marker at the bass entry");
        assert_eq!(hit.label, "Drop");
        assert_eq!(hit.color, "#FF0000");
        assert_eq!(hit.source, CueSource::AutoDrop);
    }

    #[test]
    fn test_hat_bursts_over_silent_low_end_are_builds() {
        let sr = 22050;
        let white = noise(sr * 30, 11);
        let mut samples = vec![0.0f32; white.len()];
        // Second difference keeps the noise above a few kHz; rolls get louder up to 16 s
        for i in 2..samples.len() {
            let t = i as f32 / sr as f32;
            if t < 16.0 && t % 2.0 < 0.25 {
                let gain = 0.05 + 0.2 * t / 16.0;
                samples[i] = gain * (white[i] - 2.0 * white[i - 1] + white[i - 2]);
            }
        }
        let buffer = SampleBuffer::new(&samples, sr as u32).unwrap();
        let markers = detect_drops(&buffer);

        assert!(!markers.is_empty(), "expected build markers");
        assert_marker_invariants(&markers);
        for marker in &markers {
            assert!(marker.position < 16.5, "marker after the roll at {}", marker.position);
            assert_eq!(marker.label, "Build");
            assert_eq!(marker.color, "#FFBF00");
            assert_eq!(marker.source, CueSource::AutoBuild);
        }
    }

    #[test]
    fn test_steady_tones_have_no_markers() {
        let sr = 44100;
        for freq in [55.0f32, 440.0] {
            let samples: Vec<f32> = (0..sr * 60)
                .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
                .collect();
            let buffer = SampleBuffer::new(&samples, sr as u32).unwrap();
            let markers = detect_drops(&buffer);
            assert!(markers.is_empty(), "{} Hz tone produced {:?}", freq, markers);
        }
    }

    #[test]
    fn test_noise_bursts_respect_invariants() {
        let sr = 22050;
        let mut samples = noise(sr * 120, 42);
        // Loud bursts every 3 s, far denser than the 8 s gap
        for (i, sample) in samples.iter_mut().enumerate() {
            let t = i as f32 / sr as f32;
            *sample *= if t % 3.0 < 0.2 { 0.9 } else { 0.05 };
        }
        let buffer = SampleBuffer::new(&samples, sr as u32).unwrap();
        let drops = detect_drops(&buffer);
        assert!(!drops.is_empty());
        assert_marker_invariants(&drops);
        assert_eq!(drops[0].id, 100);
    }

    #[test]
    fn test_silence_and_short_buffers_have_no_markers() {
        let silence = vec![0.0f32; 44100 * 30];
        assert!(detect_drops(&SampleBuffer::new(&silence, 44100).unwrap()).is_empty());

        let short = noise(4410, 3);
        assert!(detect_drops(&SampleBuffer::new(&short, 44100).unwrap()).is_empty());
    }

    #[test]
    fn test_score_frame_drop_weights_low_bands() {
        let config = DropConfig::default();
        let (kind, score) = score_frame(&[2.0, 1.0, 0.0, 0.0], &[1.0, 0.0, 1.0, 1.0], &config).unwrap();
        assert_eq!(kind, MarkerKind::Drop);
        assert!((score - (0.4 * 1.0 + 0.3 * 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_score_frame_build_needs_quiet_low_end() {
        let config = DropConfig::default();
        let threshold = [1.0, 1.0, 1.0, 1.0];

        let (kind, score) = score_frame(&[0.1, 0.2, 3.0, 2.0], &threshold, &config).unwrap();
        assert_eq!(kind, MarkerKind::Build);
        assert!((score - (0.6 * 2.0 + 0.4 * 1.0)).abs() < 1e-6);

        // Bass at 0.6 of its threshold: no longer a build, only the weaker drop score remains
        let (kind, _) = score_frame(&[0.1, 0.6, 3.0, 2.0], &threshold, &config).unwrap();
        assert_eq!(kind, MarkerKind::Drop);

        assert_eq!(score_frame(&[0.5, 0.5, 0.5, 0.5], &threshold, &config), None);
    }

    #[test]
    fn test_select_markers_gap_and_limit() {
        let candidates: Vec<Candidate> = (0..100)
            .map(|i| Candidate {
                time: i as f64,
                score: (i % 7) as f32 + 1.0,
                kind: MarkerKind::Drop,
            })
            .collect();
        let selected = select_markers(candidates, 8.0, 8);
        assert_eq!(selected.len(), 8);
        for pair in selected.windows(2) {
            assert!(pair[1].time - pair[0].time >= 8.0);
        }
    }

    #[test]
    fn test_select_markers_prefers_higher_score() {
        let candidates = vec![
            Candidate { time: 10.0, score: 1.0, kind: MarkerKind::Build },
            Candidate { time: 12.0, score: 5.0, kind: MarkerKind::Drop },
            Candidate { time: 30.0, score: 2.0, kind: MarkerKind::Build },
        ];
        let selected = select_markers(candidates, 8.0, 8);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].time, 12.0);
        assert_eq!(selected[1].time, 30.0);
    }

    #[test]
    fn test_adaptive_threshold_ignores_sparse_spike() {
        let mut values = vec![1.0f32; 21];
        values[10] = 100.0;
        let threshold = adaptive_threshold(&values, 5, 2.5);
        assert_eq!(threshold[10], 1.0);
        assert!(values[10] > threshold[10]);
    }
}
