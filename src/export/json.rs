//! JSON export of analysis results
//!
//! One `djcue.json` per output directory. Re-running the pipeline merges new
//! results into the existing file, replacing entries for re-analyzed paths.

use crate::analysis::key::camelot;
use crate::error::{AnalyzeError, Result};
use crate::types::{AnalysisResult, AnalyzedTrack};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON output structure
#[derive(Debug, Serialize, Deserialize)]
pub struct DjcueJson {
    /// Schema version for forward compatibility
    pub version: String,
    pub metadata: ExportMetadata,
    pub tracks: Vec<TrackJson>,
}

/// Export metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// djcue version that generated this file
    pub generator_version: String,
    /// RFC 3339 timestamp of export
    pub exported_at: String,
    pub track_count: usize,
}

/// JSON representation of an analyzed track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackJson {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    /// Standard notation (e.g., "Am", "C#"), absent when the key is unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_standard: Option<String>,
    /// Open Key notation (e.g., "1m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_open: Option<String>,
    pub analysis: AnalysisResult,
}

impl From<&AnalyzedTrack> for TrackJson {
    fn from(track: &AnalyzedTrack) -> Self {
        Self {
            path: track.path.to_string_lossy().to_string(),
            duration_seconds: track.duration_seconds,
            sample_rate: track.sample_rate,
            key_standard: camelot::to_standard_notation(track.result.key),
            key_open: camelot::to_open_key(track.result.key),
            analysis: track.result.clone(),
        }
    }
}

/// Write tracks to a JSON file
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
/// This prevents data corruption if the write is interrupted.
pub fn write_json(tracks: &[TrackJson], output_path: &Path) -> Result<()> {
    // Temp file in the same directory keeps the rename on one filesystem
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| AnalyzeError::output_error(output_path, e))?;
    let writer = BufWriter::new(file);

    let output = DjcueJson {
        version: SCHEMA_VERSION.to_string(),
        metadata: ExportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            track_count: tracks.len(),
        },
        tracks: tracks.to_vec(),
    };

    serde_json::to_writer_pretty(writer, &output).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        AnalyzeError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        AnalyzeError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!("Wrote {} tracks to {}", tracks.len(), output_path.display());

    Ok(())
}

/// Merge freshly analyzed tracks over previously exported ones, sorted by path
pub fn merge_tracks(existing: Vec<TrackJson>, analyzed: &[AnalyzedTrack]) -> Vec<TrackJson> {
    let fresh: Vec<TrackJson> = analyzed.iter().map(TrackJson::from).collect();
    let replaced: HashSet<&str> = fresh.iter().map(|t| t.path.as_str()).collect();

    let mut merged: Vec<TrackJson> = existing
        .into_iter()
        .filter(|t| !replaced.contains(t.path.as_str()))
        .collect();
    merged.extend(fresh);
    merged.sort_by(|a, b| a.path.cmp(&b.path));
    merged
}

/// Read existing analysis from JSON file
///
/// Returns the set of file paths that have already been analyzed.
/// If the file doesn't exist or can't be parsed, returns an empty set.
pub fn read_existing_analysis(json_path: &Path) -> HashSet<String> {
    let paths: HashSet<String> = read_existing_tracks(json_path)
        .into_iter()
        .map(|t| t.path)
        .collect();

    if !paths.is_empty() {
        debug!(
            "Loaded {} previously analyzed tracks from {}",
            paths.len(),
            json_path.display()
        );
    }
    paths
}

/// Read existing analysis and return the full track data
pub fn read_existing_tracks(json_path: &Path) -> Vec<TrackJson> {
    if !json_path.exists() {
        debug!("No existing analysis file at {}", json_path.display());
        return Vec::new();
    }

    let file = match File::open(json_path) {
        Ok(f) => f,
        Err(e) => {
            debug!("Could not open existing analysis: {}", e);
            return Vec::new();
        }
    };

    match serde_json::from_reader::<_, DjcueJson>(BufReader::new(file)) {
        Ok(json) => json.tracks,
        Err(e) => {
            debug!("Could not parse existing analysis: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CamelotKey, Mood, SpectralFeatures};
    use std::path::PathBuf;

    fn track(path: &str, bpm: u32) -> AnalyzedTrack {
        AnalyzedTrack {
            path: PathBuf::from(path),
            duration_seconds: 180.0,
            sample_rate: 44100,
            result: AnalysisResult {
                bpm,
                key: "8A".parse().unwrap(),
                energy: 7,
                features: SpectralFeatures::default(),
                drops: Vec::new(),
                intro_time: 0.0,
                outro_time: 180.0,
                auto_tags: vec!["AI: Dark".to_string()],
                mood: Mood::Duester,
            },
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("djcue.json");
        let tracks: Vec<TrackJson> = [track("/music/a.wav", 124)].iter().map(TrackJson::from).collect();

        write_json(&tracks, &path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], "1.0");
        assert_eq!(raw["metadata"]["track_count"], 1);
        let entry = &raw["tracks"][0];
        assert_eq!(entry["analysis"]["key"], "8A");
        assert_eq!(entry["analysis"]["mood"], "Düster");
        assert_eq!(entry["key_standard"], "Am");
        assert_eq!(entry["key_open"], "1m");

        assert_eq!(read_existing_tracks(&path), tracks);
        assert!(read_existing_analysis(&path).contains("/music/a.wav"));
    }

    #[test]
    fn test_unknown_key_omits_notations() {
        let mut t = track("/music/b.wav", 0);
        t.result.key = CamelotKey::Unknown;
        let json = TrackJson::from(&t);
        assert_eq!(json.key_standard, None);
        let value = serde_json::to_value(&json).unwrap();
        assert!(value.get("key_open").is_none());
        assert_eq!(value["analysis"]["key"], "N/A");
    }

    #[test]
    fn test_merge_replaces_reanalyzed_paths() {
        let existing: Vec<TrackJson> = [track("/m/b.wav", 100), track("/m/c.wav", 110)]
            .iter()
            .map(TrackJson::from)
            .collect();
        let merged = merge_tracks(existing, &[track("/m/c.wav", 128), track("/m/a.wav", 90)]);

        let summary: Vec<(&str, u32)> = merged.iter().map(|t| (t.path.as_str(), t.analysis.bpm)).collect();
        assert_eq!(summary, vec![("/m/a.wav", 90), ("/m/b.wav", 100), ("/m/c.wav", 128)]);
    }

    #[test]
    fn test_missing_or_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("djcue.json");
        assert!(read_existing_tracks(&path).is_empty());
        std::fs::write(&path, "{ not json").unwrap();
        assert!(read_existing_analysis(&path).is_empty());
    }
}
