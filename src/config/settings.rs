//! Runtime configuration settings

use super::analysis::AnalysisConfig;
use crate::error::Result;
use std::path::PathBuf;

/// Name of the JSON file written to the output directory
pub const OUTPUT_FILE_NAME: &str = "djcue.json";

/// Runtime settings for the batch pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input path (file or directory)
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// Analyzer constants
    pub analysis: AnalysisConfig,
    /// Number of analysis worker threads
    pub analysis_threads: usize,
    /// Scan recursively
    pub recursive: bool,
    /// Overwrite existing analysis
    pub force: bool,
    /// Show progress bars
    pub show_progress: bool,
    /// Dry run mode - show files without processing
    pub dry_run: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Result<Self> {
        let analysis = match &cli.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };

        Ok(Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            analysis,
            analysis_threads: cli.threads.unwrap_or_else(default_threads).max(1),
            recursive: cli.recursive,
            force: cli.force,
            show_progress: !cli.quiet,
            dry_run: cli.dry_run,
        })
    }

    /// Path of the JSON results file
    pub fn output_file(&self) -> PathBuf {
        self.output.join(OUTPUT_FILE_NAME)
    }
}

/// Leave one core for decoding and the progress display
fn default_threads() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            output: PathBuf::from("./output"),
            analysis: AnalysisConfig::default(),
            analysis_threads: default_threads(),
            recursive: true,
            force: false,
            show_progress: true,
            dry_run: false,
        }
    }
}
