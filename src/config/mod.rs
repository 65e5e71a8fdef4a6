//! Configuration and CLI handling

pub mod analysis;
pub mod cli;
pub mod settings;

pub use analysis::{
    AnalysisConfig, ClassifyConfig, DropConfig, FeatureConfig, FeatureScales, KeyConfig,
    MoodFormula, MoodTerm, SectionConfig, TagThresholds, TempoConfig, MAX_MARKERS_LIMIT,
};
pub use cli::Cli;
pub use settings::Settings;
