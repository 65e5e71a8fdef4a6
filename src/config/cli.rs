//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

/// djcue - audio analysis for DJ libraries
///
/// Analyzes audio files to derive BPM, Camelot key, energy, mood and
/// drop/build cue markers. Writes the results as JSON.
#[derive(Parser, Debug)]
#[command(name = "djcue")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Input path (file or directory)
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output directory for djcue.json
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// JSON file overriding analysis constants
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of analysis workers (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Scan subdirectories recursively
    #[arg(short, long, default_value = "true")]
    pub recursive: bool,

    /// Re-analyze tracks already present in the output
    #[arg(long, default_value = "false")]
    pub force: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Dry run - show files that would be analyzed without processing
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl Cli {
    /// Log filter directive derived from the verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_minimal_arguments() {
        let cli = Cli::parse_from(["djcue", "-i", "music", "-o", "out"]);
        assert_eq!(cli.input, PathBuf::from("music"));
        assert!(cli.recursive);
        assert!(!cli.force);
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn test_quiet_overrides_verbosity() {
        let cli = Cli::parse_from(["djcue", "-i", "a.wav", "-o", "out", "-vv", "-q"]);
        assert_eq!(cli.log_filter(), "error");
    }
}
