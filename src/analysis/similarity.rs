//! Track similarity
//!
//! Cosine similarity over feature vectors; harmonic compatibility lives in
//! `key::camelot`.

use crate::analysis::classify::scaled_features;
use crate::config::FeatureScales;
use crate::types::AnalysisResult;

/// Cosine similarity in `[-1, 1]`
///
/// Returns 0 for mismatched lengths, empty input, or a zero-norm vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if !(denom > 0.0) || !denom.is_finite() {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0) as f32
}

/// Timbre + harmony descriptor: the 12 chroma bins followed by the scalar
/// features divided by the same scales the mood terms use
pub fn feature_vector(result: &AnalysisResult, scales: &FeatureScales) -> Vec<f32> {
    let mut vector = Vec::with_capacity(17);
    vector.extend_from_slice(&result.features.chroma_vector);
    vector.extend_from_slice(&scaled_features(&result.features, scales));
    vector.push(result.energy as f32 / 10.0);
    vector
}

/// Cosine similarity of two analysed tracks' feature vectors
pub fn track_similarity(a: &AnalysisResult, b: &AnalysisResult, scales: &FeatureScales) -> f32 {
    cosine_similarity(&feature_vector(a, scales), &feature_vector(b, scales))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CamelotKey, Mood, SpectralFeatures};

    fn result(chroma_bin: usize, centroid: f32) -> AnalysisResult {
        let mut chroma_vector = [0.0; 12];
        chroma_vector[chroma_bin] = 1.0;
        AnalysisResult {
            bpm: 120,
            key: CamelotKey::Unknown,
            energy: 6,
            features: SpectralFeatures {
                centroid,
                rolloff: 5000.0,
                zero_crossing_rate: 0.05,
                rms: 0.2,
                chroma_vector,
            },
            drops: Vec::new(),
            intro_time: 0.0,
            outro_time: 60.0,
            auto_tags: Vec::new(),
            mood: Mood::Episch,
        }
    }

    #[test]
    fn test_self_similarity_is_one() {
        let a = [0.3, -1.2, 4.0, 0.001];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let a = [1.0, 2.0, 3.0];
        let b = [-3.0, 0.5, 2.0];
        let ab = cosine_similarity(&a, &b);
        assert_eq!(ab, cosine_similarity(&b, &a));
        assert!((-1.0..=1.0).contains(&ab));
        assert_eq!(cosine_similarity(&a, &[-1.0, -2.0, -3.0]), -1.0);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs_are_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_track_similarity_prefers_shared_harmony() {
        let scales = FeatureScales::default();
        let a = result(9, 2000.0);
        let same_key = result(9, 2400.0);
        let other_key = result(2, 2000.0);
        assert!(track_similarity(&a, &same_key, &scales) > track_similarity(&a, &other_key, &scales));
        assert!((track_similarity(&a, &a, &scales) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_feature_vector_uses_configured_scales() {
        let a = result(9, 2000.0);
        let vector = feature_vector(&a, &FeatureScales::default());
        assert_eq!(vector.len(), 17);
        assert_eq!(&vector[12..], &[0.5, 0.625, 0.05 / 0.15, 0.2 / 0.3, 0.6]);

        let halved = FeatureScales {
            centroid_hz: 1000.0,
            ..FeatureScales::default()
        };
        assert_eq!(feature_vector(&a, &halved)[12], 2.0);
    }
}
