//! Full-pipeline analysis of one buffer
//!
//! The engine owns only immutable configuration and shared detector handles,
//! so one instance can be used from any number of threads at once.

use crate::analysis::classify::{auto_tags, classify_mood, compute_energy};
use crate::analysis::drops::detect_drops_with;
use crate::analysis::features::analyze_features;
use crate::analysis::sections::detect_sections_with;
use crate::analysis::{BpmDetector, ChromaKeyDetector, KeyDetector, TempoEstimator};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::types::{AnalysisResult, AudioBuffer, SampleBuffer};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Stateless analysis pipeline: tempo, key, drops, features, energy, mood,
/// intro/outro and auto-tags
#[derive(Clone)]
pub struct Engine {
    config: AnalysisConfig,
    bpm_detector: Arc<dyn BpmDetector>,
    key_detector: Arc<dyn KeyDetector>,
}

impl Engine {
    /// Build an engine with the built-in tempo and key estimators
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_builtin_detectors(config))
    }

    fn with_builtin_detectors(config: AnalysisConfig) -> Self {
        let bpm_detector: Arc<dyn BpmDetector> = Arc::new(TempoEstimator::new(config.tempo.clone()));
        let key_detector: Arc<dyn KeyDetector> = Arc::new(ChromaKeyDetector::new(config.key.clone()));
        Self {
            config,
            bpm_detector,
            key_detector,
        }
    }

    /// Replace the tempo backend
    pub fn with_bpm_detector(mut self, detector: Arc<dyn BpmDetector>) -> Self {
        self.bpm_detector = detector;
        self
    }

    /// Replace the key backend
    pub fn with_key_detector(mut self, detector: Arc<dyn KeyDetector>) -> Self {
        self.key_detector = detector;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every analyzer over `buffer` and aggregate the results
    ///
    /// Never fails: short or silent input produces neutral values.
    pub fn analyze(&self, buffer: &SampleBuffer) -> AnalysisResult {
        let bpm = self.bpm_detector.detect(buffer);
        let key = self.key_detector.detect(buffer);
        let drops = detect_drops_with(buffer, &self.config.drops);

        let analysis = analyze_features(buffer, &self.config.features, &self.config.key);
        let features = analysis.features;
        let energy = compute_energy(
            &analysis.frame_rms,
            features.rolloff,
            buffer.nyquist(),
            bpm,
            &self.config.features,
        );

        let sections = detect_sections_with(buffer, &self.config.sections);
        let tags = auto_tags(&features, bpm, key, energy, &drops, &self.config.classify.tags);
        let mood = classify_mood(&features, bpm, key, energy, &self.config);

        debug!(
            "Analysis ({} / {}): {} BPM, key {}, energy {}, {} markers, mood {}",
            self.bpm_detector.name(),
            self.key_detector.name(),
            bpm,
            key,
            energy,
            drops.len(),
            mood
        );

        AnalysisResult {
            bpm,
            key,
            energy,
            features,
            drops,
            intro_time: sections.intro_time,
            outro_time: sections.outro_time,
            auto_tags: tags,
            mood,
        }
    }

    /// Analyze many owned buffers data-parallel on the rayon pool
    ///
    /// Results keep the input order; a buffer violating the sample contract
    /// yields its validation error in place.
    pub fn analyze_many(&self, buffers: &[AudioBuffer]) -> Vec<Result<AnalysisResult>> {
        buffers
            .par_iter()
            .map(|buffer| buffer.as_sample_buffer().map(|view| self.analyze(&view)))
            .collect()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_builtin_detectors(AnalysisConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("bpm_detector", &self.bpm_detector.name())
            .field("key_detector", &self.key_detector.name())
            .finish_non_exhaustive()
    }
}
