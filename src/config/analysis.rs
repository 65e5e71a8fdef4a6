//! Tunable analysis constants
//!
//! Heuristic thresholds, weights and frame sizes for the analyzers, so they can
//! be adjusted (or loaded from a JSON file) without touching algorithm code.
//! Musical reference data (key profiles, the Camelot wheel) stays with the
//! analyzers that own it.

use crate::error::{AnalyzeError, Result};
use crate::types::Mood;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete analyzer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tempo: TempoConfig,
    pub key: KeyConfig,
    pub drops: DropConfig,
    pub features: FeatureConfig,
    pub sections: SectionConfig,
    pub classify: ClassifyConfig,
}

/// Tempo estimator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub fft_size: usize,
    pub hop_size: usize,
    /// Autocorrelation lag search range, in BPM
    pub min_search_bpm: f32,
    pub max_search_bpm: f32,
    /// Centre of the log-normal tempo prior
    pub prior_center_bpm: f32,
    /// Standard deviation of the prior, in octaves
    pub prior_width_octaves: f32,
    /// Output is folded into [fold_min_bpm, fold_max_bpm]
    pub fold_min_bpm: f32,
    pub fold_max_bpm: f32,
    /// Gain inside log(1 + gain * autocorr)
    pub autocorr_gain: f32,
    /// Onset envelopes shorter than this yield 0 BPM
    pub min_envelope_frames: usize,
    /// Strongest onset relative to the loudest frame's magnitude sum below
    /// which the signal counts as steady and yields 0 BPM
    pub min_onset_ratio: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 1024,
            min_search_bpm: 30.0,
            max_search_bpm: 300.0,
            prior_center_bpm: 120.0,
            prior_width_octaves: 1.0,
            fold_min_bpm: 60.0,
            fold_max_bpm: 150.0,
            autocorr_gain: 1e6,
            min_envelope_frames: 10,
            min_onset_ratio: 0.02,
        }
    }
}

/// Key estimator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub fft_size: usize,
    pub hop_size: usize,
    /// Length of the centred analysis segment
    pub segment_secs: f64,
    /// Only bins inside [min_freq_hz, max_freq_hz] feed the chroma vector
    pub min_freq_hz: f32,
    pub max_freq_hz: f32,
    /// Tuning reference for MIDI note 69
    pub reference_a4_hz: f32,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            fft_size: 8192,
            hop_size: 4096,
            segment_secs: 60.0,
            min_freq_hz: 50.0,
            max_freq_hz: 4000.0,
            reference_a4_hz: 440.0,
        }
    }
}

/// Drop/build detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    pub fft_size: usize,
    pub hop_size: usize,
    /// Lower edges of sub-bass, bass, mid and high bands; each band ends where
    /// the next begins and the high band runs to Nyquist
    pub band_edges_hz: [f32; 4],
    /// Drop score weight per band (sub-bass, bass, mid, high)
    pub band_weights: [f32; 4],
    /// Build score weight for mid and high excess
    pub build_weights: [f32; 2],
    /// Bass bands must stay below this fraction of their threshold for a build
    pub build_bass_ratio: f32,
    /// Half-width of the sliding median window
    pub threshold_window_secs: f64,
    pub mad_multiplier: f32,
    pub min_gap_secs: f64,
    pub max_markers: usize,
    pub min_frames: usize,
    /// Flux below this fraction of the loudest frame's total band energy never
    /// counts as excess, so steady signals yield no markers
    pub noise_floor: f32,
    pub first_cue_id: u32,
    pub drop_color: String,
    pub build_color: String,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 1024,
            band_edges_hz: [20.0, 100.0, 300.0, 4000.0],
            band_weights: [0.4, 0.3, 0.2, 0.1],
            build_weights: [0.6, 0.4],
            build_bass_ratio: 0.5,
            threshold_window_secs: 2.0,
            mad_multiplier: 2.5,
            min_gap_secs: 8.0,
            max_markers: 8,
            min_frames: 10,
            noise_floor: 0.01,
            first_cue_id: 100,
            drop_color: "#FF0000".to_string(),
            build_color: "#FFBF00".to_string(),
        }
    }
}

/// Spectral feature, energy and classification parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub fft_size: usize,
    pub hop_size: usize,
    /// Fraction of spectral energy below the rolloff frequency
    pub rolloff_fraction: f32,
    /// Fraction of loudest frames used as the dynamic reference
    pub loud_frame_fraction: f32,
    /// Energy blend weights: dynamics, spectral fullness, tempo
    pub energy_weights: [f32; 3],
    pub energy_min_bpm: f32,
    pub energy_max_bpm: f32,
    /// Energy reported when there are too few frames
    pub default_energy: u8,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 1024,
            rolloff_fraction: 0.85,
            loud_frame_fraction: 0.1,
            energy_weights: [0.4, 0.3, 0.3],
            energy_min_bpm: 60.0,
            energy_max_bpm: 200.0,
            default_energy: 5,
        }
    }
}

/// Intro/outro scan parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub window_secs: f64,
    /// Windows below this fraction of the peak window RMS count as quiet
    pub peak_fraction: f32,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            window_secs: 0.5,
            peak_fraction: 0.03,
        }
    }
}

/// Feature values at which a normalized descriptor saturates
///
/// Shared by the mood terms and the similarity feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureScales {
    pub centroid_hz: f32,
    pub rolloff_hz: f32,
    pub zero_crossing_rate: f32,
    pub rms: f32,
}

impl Default for FeatureScales {
    fn default() -> Self {
        Self {
            centroid_hz: 4000.0,
            rolloff_hz: 8000.0,
            zero_crossing_rate: 0.15,
            rms: 0.3,
        }
    }
}

/// Normalized input a mood formula can weight; each pair is complementary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodTerm {
    Energy,
    Calm,
    Tempo,
    Slow,
    Bright,
    Dark,
    Noisy,
    Smooth,
    Loud,
    Quiet,
    Full,
    Major,
    Minor,
}

/// Weighted sum of terms scoring one mood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodFormula {
    pub mood: Mood,
    pub weights: Vec<(MoodTerm, f32)>,
}

impl MoodFormula {
    fn new(mood: Mood, weights: &[(MoodTerm, f32)]) -> Self {
        Self {
            mood,
            weights: weights.to_vec(),
        }
    }
}

fn default_mood_formulas() -> Vec<MoodFormula> {
    use MoodTerm::*;
    vec![
        MoodFormula::new(Mood::Froehlich, &[(Major, 0.3), (Bright, 0.25), (Tempo, 0.25), (Energy, 0.2)]),
        MoodFormula::new(Mood::Melancholisch, &[(Minor, 0.35), (Slow, 0.25), (Dark, 0.2), (Calm, 0.2)]),
        MoodFormula::new(Mood::Aggressiv, &[(Energy, 0.3), (Noisy, 0.25), (Loud, 0.25), (Tempo, 0.2)]),
        MoodFormula::new(Mood::Entspannt, &[(Calm, 0.35), (Slow, 0.25), (Smooth, 0.2), (Quiet, 0.2)]),
        MoodFormula::new(Mood::Episch, &[(Full, 0.3), (Energy, 0.25), (Loud, 0.25), (Minor, 0.2)]),
        MoodFormula::new(Mood::Mysterioes, &[(Dark, 0.35), (Minor, 0.25), (Smooth, 0.2), (Quiet, 0.2)]),
        MoodFormula::new(Mood::Romantisch, &[(Major, 0.3), (Slow, 0.3), (Smooth, 0.2), (Quiet, 0.2)]),
        MoodFormula::new(Mood::Duester, &[(Dark, 0.35), (Minor, 0.3), (Loud, 0.2), (Full, 0.15)]),
    ]
}

/// Auto-tag trigger thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagThresholds {
    pub energetic_min_energy: u8,
    pub chill_max_energy: u8,
    /// Dark also requires a minor key
    pub dark_max_centroid_hz: f32,
    pub bright_min_centroid_hz: f32,
    pub vocal_centroid_hz: [f32; 2],
    pub vocal_zero_crossing_rate: [f32; 2],
    pub fast_min_bpm: u32,
    /// Exclusive; an unknown tempo is never slow
    pub slow_max_bpm: u32,
    pub bass_heavy_max_rolloff_hz: f32,
    pub bass_heavy_min_rms: f32,
    pub min_drop_count: usize,
}

impl Default for TagThresholds {
    fn default() -> Self {
        Self {
            energetic_min_energy: 8,
            chill_max_energy: 3,
            dark_max_centroid_hz: 1500.0,
            bright_min_centroid_hz: 3500.0,
            vocal_centroid_hz: [1000.0, 3500.0],
            vocal_zero_crossing_rate: [0.05, 0.15],
            fast_min_bpm: 140,
            slow_max_bpm: 90,
            bass_heavy_max_rolloff_hz: 2000.0,
            bass_heavy_min_rms: 0.1,
            min_drop_count: 2,
        }
    }
}

/// Mood and auto-tag parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub scales: FeatureScales,
    /// Evaluated in order; ties go to the earlier formula
    pub moods: Vec<MoodFormula>,
    pub tags: TagThresholds,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            scales: FeatureScales::default(),
            moods: default_mood_formulas(),
            tags: TagThresholds::default(),
        }
    }
}

/// Upper bound on `drops.max_markers`
pub const MAX_MARKERS_LIMIT: usize = 64;

impl AnalysisConfig {
    /// Load a configuration from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalyzeError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AnalysisConfig = serde_json::from_str(&content).map_err(|e| {
            AnalyzeError::ConfigError(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the structural preconditions the analyzers rely on
    pub fn validate(&self) -> Result<()> {
        let frame_sizes = [
            ("tempo", self.tempo.fft_size, self.tempo.hop_size),
            ("key", self.key.fft_size, self.key.hop_size),
            ("drops", self.drops.fft_size, self.drops.hop_size),
            ("features", self.features.fft_size, self.features.hop_size),
        ];
        for (name, fft_size, hop_size) in frame_sizes {
            if fft_size < 2 || !fft_size.is_power_of_two() {
                return Err(AnalyzeError::ConfigError(format!(
                    "{}.fft_size must be a power of two, got {}",
                    name, fft_size
                )));
            }
            if hop_size == 0 {
                return Err(AnalyzeError::ConfigError(format!("{}.hop_size must be non-zero", name)));
            }
        }
        if self.tempo.fold_min_bpm <= 0.0 || self.tempo.fold_max_bpm < 2.0 * self.tempo.fold_min_bpm {
            return Err(AnalyzeError::ConfigError(
                "tempo fold range must span at least one octave".to_string(),
            ));
        }
        if !(self.tempo.min_onset_ratio.is_finite() && self.tempo.min_onset_ratio >= 0.0) {
            return Err(AnalyzeError::ConfigError(
                "tempo.min_onset_ratio must be a non-negative number".to_string(),
            ));
        }
        let drops = &self.drops;
        if !(drops.min_gap_secs.is_finite() && drops.min_gap_secs > 0.0) {
            return Err(AnalyzeError::ConfigError(format!(
                "drops.min_gap_secs must be positive, got {}",
                drops.min_gap_secs
            )));
        }
        // Bounded so the half window in frames stays far from usize overflow
        if !(drops.threshold_window_secs.is_finite()
            && drops.threshold_window_secs > 0.0
            && drops.threshold_window_secs <= 3600.0)
        {
            return Err(AnalyzeError::ConfigError(format!(
                "drops.threshold_window_secs must be within (0, 3600], got {}",
                drops.threshold_window_secs
            )));
        }
        if drops.max_markers > MAX_MARKERS_LIMIT {
            return Err(AnalyzeError::ConfigError(format!(
                "drops.max_markers must be at most {}, got {}",
                MAX_MARKERS_LIMIT, drops.max_markers
            )));
        }
        if !(drops.noise_floor.is_finite() && drops.noise_floor >= 0.0) {
            return Err(AnalyzeError::ConfigError(
                "drops.noise_floor must be a non-negative number".to_string(),
            ));
        }
        if self.classify.moods.is_empty() {
            return Err(AnalyzeError::ConfigError(
                "classify.moods needs at least one formula".to_string(),
            ));
        }
        if !(1..=10).contains(&self.features.default_energy) {
            return Err(AnalyzeError::ConfigError(
                "features.default_energy must be within 1-10".to_string(),
            ));
        }
        Ok(())
    }
}
