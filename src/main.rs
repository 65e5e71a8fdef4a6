//! djcue CLI entry point

use clap::Parser;
use djcue::config::{Cli, Settings};
use djcue::pipeline::{self, PipelineResult};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let outcome = check_paths(&cli).and_then(|()| {
        let settings = Settings::from_cli(&cli).map_err(|e| e.to_string())?;
        pipeline::run(&settings).map_err(|e| format!("analysis aborted: {}", e))
    });

    match outcome {
        Ok(result) => {
            print_summary(&result);
            // Skipped tracks are expected in real libraries; only hard failures change the code
            if result.failed > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only the summary
fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(result: &PipelineResult) {
    println!();
    println!(
        "{} of {} tracks analyzed ({} failed, {} skipped)",
        result.successful, result.total_files, result.failed, result.skipped
    );
}

fn check_paths(cli: &Cli) -> Result<(), String> {
    if !cli.input.exists() {
        return Err(format!(
            "no such file or folder: {}\n\n  Pass a track or a folder of tracks, e.g.\n    djcue -i ~/Music/Sets -o ./cues\n    djcue -i ./track.flac -o ./cues",
            cli.input.display()
        ));
    }

    // djcue creates the output folder, not its parents
    let parent = cli.output.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent.filter(|p| !p.exists()) {
        return Err(format!(
            "cannot create {} because {} is missing\n\n  Create it first: mkdir -p {}",
            cli.output.display(),
            parent.display(),
            parent.display()
        ));
    }

    match &cli.config {
        Some(config) if !config.is_file() => {
            Err(format!("analysis config not found: {}", config.display()))
        }
        _ => Ok(()),
    }
}
