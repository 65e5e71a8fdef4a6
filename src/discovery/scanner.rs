//! Input discovery: turn a file or folder argument into a list of tracks

use crate::error::{AnalyzeError, Result};
use crate::types::AudioFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A supported audio file found by [`scan`]
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

/// Collect the analyzable files under `input`
///
/// A file argument must itself be supported. A directory is walked one level
/// deep, or fully with `recursive`; unreadable entries and other extensions
/// are passed over. Results are sorted by path so batch ids are stable
/// between runs.
pub fn scan(input: &Path, recursive: bool) -> Result<Vec<DiscoveredFile>> {
    if !input.exists() {
        return Err(AnalyzeError::FileNotFound(input.to_path_buf()));
    }

    let mut files = if input.is_file() {
        vec![inspect(input).ok_or_else(|| unsupported(input))?]
    } else {
        walk(input, recursive)
    };
    files.sort_by(|a, b| a.path.cmp(&b.path));

    if files.is_empty() {
        warn!("No supported audio files found in {}", input.display());
    } else {
        info!("Found {} audio files in {}", files.len(), input.display());
    }
    Ok(files)
}

fn walk(dir: &Path, recursive: bool) -> Vec<DiscoveredFile> {
    let depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(dir)
        .max_depth(depth)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| inspect(entry.path()))
        .inspect(|file| debug!("Found {:?}: {}", file.format, file.path.display()))
        .collect()
}

fn inspect(path: &Path) -> Option<DiscoveredFile> {
    let format = AudioFormat::from_extension(path.extension()?.to_str()?)?;
    let size_bytes = std::fs::metadata(path).ok()?.len();
    Some(DiscoveredFile {
        path: path.to_path_buf(),
        format,
        size_bytes,
    })
}

fn unsupported(path: &Path) -> AnalyzeError {
    let format = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());
    AnalyzeError::UnsupportedFormat {
        path: path.to_path_buf(),
        format,
    }
}
