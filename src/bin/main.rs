//! CLI for gpumon

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::error;

use gpumon::{detect_backend, Monitor, MonitorConfig, ShutdownFlag};

#[derive(Parser)]
#[command(name = "gpumon")]
#[command(about = "GPU usage monitor: logs per-device metrics to CSV", long_about = None)]
#[command(version)]
struct Cli {
    /// Monitoring interval in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Output CSV file path
    #[arg(long = "out", visible_alias = "output", default_value = "gpu_usage.csv")]
    out: PathBuf,

    /// Duration in hours (default: run indefinitely)
    #[arg(long)]
    duration: Option<f64>,

    /// Run a single query, print the results, and exit
    #[arg(long)]
    test: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if cli.test {
        return run_test_query();
    }

    let config = MonitorConfig {
        output_path: cli.out,
        interval: Duration::from_secs(cli.interval),
        duration: cli
            .duration
            .map(|hours| Duration::from_secs_f64(hours.max(0.0) * 3600.0)),
    };

    match run_monitor(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("monitoring failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_monitor(config: MonitorConfig) -> gpumon::Result<()> {
    let shutdown = ShutdownFlag::new();
    #[cfg(unix)]
    shutdown.install_signal_handlers()?;

    let mut monitor = Monitor::new(config, detect_backend(), shutdown);
    monitor.run()?;
    Ok(())
}

/// One query round, printed as JSON. Exits 0 when at least one device was
/// found, 1 otherwise.
fn run_test_query() -> ExitCode {
    let backend = detect_backend();
    match backend.query() {
        Ok(snapshots) if !snapshots.is_empty() => {
            match serde_json::to_string_pretty(&snapshots) {
                Ok(json) => {
                    println!("GPU Test Results:");
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("failed to render snapshots: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Ok(_) => {
            println!("No GPUs detected");
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("No GPUs detected ({})", e);
            ExitCode::FAILURE
        }
    }
}
