//! Result export

pub mod json;

pub use json::{merge_tracks, read_existing_analysis, read_existing_tracks, write_json, TrackJson};
