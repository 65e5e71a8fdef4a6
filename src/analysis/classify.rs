//! Energy score, mood label and auto-tags
//!
//! These are empirically tuned heuristics over the averaged spectral features,
//! tempo and key. They are best-effort descriptors, not ground truth. The mood
//! table, feature scales and tag thresholds come from `ClassifyConfig`.

use crate::config::{AnalysisConfig, FeatureConfig, FeatureScales, MoodTerm, TagThresholds};
use crate::types::{CamelotKey, CueSource, CuePoint, Mode, Mood, SpectralFeatures};

/// 1-10 energy from dynamics, spectral fullness and tempo
///
/// - dynamics: mean frame RMS relative to the mean of the loudest frames
/// - fullness: rolloff relative to Nyquist
/// - tempo: BPM mapped linearly from `energy_min_bpm..energy_max_bpm` onto 0-1
///
/// Returns `default_energy` when fewer than two frames were analysed.
pub fn compute_energy(
    frame_rms: &[f32],
    rolloff: f32,
    nyquist: f32,
    bpm: u32,
    config: &FeatureConfig,
) -> u8 {
    if frame_rms.len() < 2 {
        return config.default_energy;
    }

    let mean_rms = frame_rms.iter().sum::<f32>() / frame_rms.len() as f32;

    let mut sorted = frame_rms.to_vec();
    sorted.sort_unstable_by(|a, b| b.total_cmp(a));
    let loud_count = ((sorted.len() as f32 * config.loud_frame_fraction).ceil() as usize)
        .clamp(1, sorted.len());
    let loud_mean = sorted[..loud_count].iter().sum::<f32>() / loud_count as f32;

    let dynamics = if loud_mean > 0.0 { (mean_rms / loud_mean).min(1.0) } else { 0.0 };
    let fullness = if nyquist > 0.0 { (rolloff / nyquist).clamp(0.0, 1.0) } else { 0.0 };
    let tempo = normalize(bpm as f32, config.energy_min_bpm, config.energy_max_bpm);

    let [w_dynamics, w_fullness, w_tempo] = config.energy_weights;
    let blend = w_dynamics * dynamics + w_fullness * fullness + w_tempo * tempo;

    (1.0 + 9.0 * blend).round().clamp(1.0, 10.0) as u8
}

/// Centroid, rolloff, zero-crossing rate and RMS divided by their saturation
/// scales (not clamped)
pub fn scaled_features(features: &SpectralFeatures, scales: &FeatureScales) -> [f32; 4] {
    let ratio = |value: f32, scale: f32| if scale > 0.0 { value / scale } else { 0.0 };
    [
        ratio(features.centroid, scales.centroid_hz),
        ratio(features.rolloff, scales.rolloff_hz),
        ratio(features.zero_crossing_rate, scales.zero_crossing_rate),
        ratio(features.rms, scales.rms),
    ]
}

struct MoodInputs {
    energy: f32,
    tempo: f32,
    bright: f32,
    noisy: f32,
    loud: f32,
    full: f32,
    major: f32,
}

impl MoodInputs {
    fn new(features: &SpectralFeatures, bpm: u32, key: CamelotKey, energy: u8, config: &AnalysisConfig) -> Self {
        let [bright, full, noisy, loud] =
            scaled_features(features, &config.classify.scales).map(|v| v.clamp(0.0, 1.0));
        Self {
            energy: normalize(energy as f32, 1.0, 10.0),
            // Unknown tempo leans neither way
            tempo: if bpm == 0 {
                0.5
            } else {
                normalize(bpm as f32, config.features.energy_min_bpm, config.features.energy_max_bpm)
            },
            bright,
            noisy,
            loud,
            full,
            major: match key.mode() {
                Some(Mode::Major) => 1.0,
                Some(Mode::Minor) => 0.0,
                None => 0.5,
            },
        }
    }

    fn term(&self, term: MoodTerm) -> f32 {
        match term {
            MoodTerm::Energy => self.energy,
            MoodTerm::Calm => 1.0 - self.energy,
            MoodTerm::Tempo => self.tempo,
            MoodTerm::Slow => 1.0 - self.tempo,
            MoodTerm::Bright => self.bright,
            MoodTerm::Dark => 1.0 - self.bright,
            MoodTerm::Noisy => self.noisy,
            MoodTerm::Smooth => 1.0 - self.noisy,
            MoodTerm::Loud => self.loud,
            MoodTerm::Quiet => 1.0 - self.loud,
            MoodTerm::Full => self.full,
            MoodTerm::Major => self.major,
            MoodTerm::Minor => 1.0 - self.major,
        }
    }
}

/// Score of every configured mood formula, in table order
pub fn mood_scores(
    features: &SpectralFeatures,
    bpm: u32,
    key: CamelotKey,
    energy: u8,
    config: &AnalysisConfig,
) -> Vec<(Mood, f32)> {
    let inputs = MoodInputs::new(features, bpm, key, energy, config);
    config
        .classify
        .moods
        .iter()
        .map(|formula| {
            let score: f32 = formula.weights.iter().map(|&(term, w)| w * inputs.term(term)).sum();
            (formula.mood, score)
        })
        .collect()
}

/// Highest-scoring mood; ties go to the earlier formula
pub fn classify_mood(
    features: &SpectralFeatures,
    bpm: u32,
    key: CamelotKey,
    energy: u8,
    config: &AnalysisConfig,
) -> Mood {
    let mut best = (Mood::Entspannt, f32::NEG_INFINITY);
    for (mood, score) in mood_scores(features, bpm, key, energy, config) {
        if score > best.1 {
            best = (mood, score);
        }
    }
    best.0
}

pub const TAG_ENERGETIC: &str = "AI: Energetic";
pub const TAG_CHILL: &str = "AI: Chill";
pub const TAG_DARK: &str = "AI: Dark";
pub const TAG_BRIGHT: &str = "AI: Bright";
pub const TAG_VOCAL: &str = "AI: Vocal";
pub const TAG_FAST: &str = "AI: Fast";
pub const TAG_SLOW: &str = "AI: Slow";
pub const TAG_BASS_HEAVY: &str = "AI: Bass Heavy";
pub const TAG_HAS_DROPS: &str = "AI: Has Drops";

/// Threshold-triggered descriptive tags; several may apply, none for silence
pub fn auto_tags(
    features: &SpectralFeatures,
    bpm: u32,
    key: CamelotKey,
    energy: u8,
    drops: &[CuePoint],
    limits: &TagThresholds,
) -> Vec<String> {
    if features.rms <= 0.0 {
        return Vec::new();
    }

    let mut tags = Vec::new();
    let mut tag = |condition: bool, name: &str| {
        if condition {
            tags.push(name.to_string());
        }
    };
    let within = |value: f32, [low, high]: [f32; 2]| (low..=high).contains(&value);

    tag(energy >= limits.energetic_min_energy, TAG_ENERGETIC);
    tag(energy <= limits.chill_max_energy, TAG_CHILL);
    tag(
        features.centroid < limits.dark_max_centroid_hz && key.mode() == Some(Mode::Minor),
        TAG_DARK,
    );
    tag(features.centroid > limits.bright_min_centroid_hz, TAG_BRIGHT);
    tag(
        within(features.centroid, limits.vocal_centroid_hz)
            && within(features.zero_crossing_rate, limits.vocal_zero_crossing_rate),
        TAG_VOCAL,
    );
    tag(bpm >= limits.fast_min_bpm, TAG_FAST);
    tag(bpm > 0 && bpm < limits.slow_max_bpm, TAG_SLOW);
    tag(
        features.rolloff < limits.bass_heavy_max_rolloff_hz && features.rms > limits.bass_heavy_min_rms,
        TAG_BASS_HEAVY,
    );
    let drop_count = drops.iter().filter(|d| d.source == CueSource::AutoDrop).count();
    tag(drop_count >= limits.min_drop_count.max(1), TAG_HAS_DROPS);

    tags
}

/// Linear map of `value` from `[min, max]` onto `[0, 1]`, clamped
fn normalize(value: f32, min: f32, max: f32) -> f32 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}
