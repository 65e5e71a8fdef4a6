//! Audio analysis modules
//!
//! Each analyzer is a total function over a validated `SampleBuffer`: short
//! or silent input yields a neutral value rather than an error. Tempo and key
//! sit behind traits so the engine can swap backends without changing
//! pipeline code.

pub mod bpm;
pub mod classify;
pub mod drops;
pub mod features;
pub mod key;
pub mod sections;
pub mod similarity;
pub mod traits;

pub use traits::{BpmDetector, KeyDetector};

pub use bpm::{detect_bpm, TempoEstimator};
pub use classify::{auto_tags, classify_mood, compute_energy};
pub use drops::detect_drops;
pub use features::extract_features;
pub use key::camelot::camelot_compatible;
pub use key::{chroma_vector, detect_key, ChromaKeyDetector};
pub use sections::{detect_sections, Sections};
pub use similarity::cosine_similarity;
