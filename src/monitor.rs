//! Sampling loop
//!
//! Drives a query backend on a fixed wall-clock interval and feeds the CSV
//! sink until the deadline passes or a stop is requested. Single-threaded:
//! each tick is one query followed by one append, then a sliced sleep that
//! a stop request can cut short.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::Result;
use crate::query::GpuQuery;
use crate::shutdown::ShutdownFlag;
use crate::sink::CsvSink;

/// Slice length for the interruptible inter-tick sleep
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Ticks between progress lines on bounded runs
const PROGRESS_EVERY: u64 = 60;

/// Settings for one monitoring session
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Destination CSV file
    pub output_path: PathBuf,
    /// Polling period
    pub interval: Duration,
    /// Stop after this much wall time; `None` runs until interrupted
    pub duration: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("gpu_usage.csv"),
            interval: Duration::from_secs(60),
            duration: None,
        }
    }
}

/// The monitoring loop: query backend, sink, and run state
pub struct Monitor {
    config: MonitorConfig,
    backend: Box<dyn GpuQuery>,
    shutdown: ShutdownFlag,
}

impl Monitor {
    pub fn new(config: MonitorConfig, backend: Box<dyn GpuQuery>, shutdown: ShutdownFlag) -> Self {
        Self {
            config,
            backend,
            shutdown,
        }
    }

    /// Run the loop to completion and return the number of ticks performed.
    ///
    /// Sink failures are fatal and propagate; query failures are recovered
    /// per tick. A stop request (signal or [`ShutdownFlag::trigger`]) is a
    /// normal completion, observed after any in-flight append finishes.
    pub fn run(&mut self) -> Result<u64> {
        let mut sink = CsvSink::initialize(&self.config.output_path)?;

        let started = Instant::now();
        let deadline = self.config.duration.map(|d| started + d);

        info!(
            "starting GPU monitoring (backend: {}, interval: {}s)",
            self.backend.name(),
            self.config.interval.as_secs()
        );
        match self.config.duration {
            Some(d) => info!("duration: {:.2} hours", d.as_secs_f64() / 3600.0),
            None => info!("duration: indefinite (Ctrl+C to stop)"),
        }

        let mut ticks = 0u64;
        let mut next_tick = Instant::now();
        loop {
            if self.shutdown.is_triggered() {
                info!("stop requested, shutting down");
                break;
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    info!("duration limit reached, stopping");
                    break;
                }
            }

            let snapshots = self.backend.query_or_empty();
            if snapshots.is_empty() {
                warn!("no device data this tick");
            } else {
                sink.append(&snapshots)?;
                for snapshot in &snapshots {
                    info!("{}", snapshot.summary());
                }
            }
            ticks += 1;

            if ticks % PROGRESS_EVERY == 0 {
                if let Some(deadline) = deadline {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    info!("tick {}, {:.0}s remaining", ticks, remaining.as_secs_f64());
                }
            }

            next_tick += self.config.interval;
            let now = Instant::now();
            if next_tick < now {
                // Query overran the interval; re-anchor instead of bursting.
                next_tick = now;
            }
            let wake = match deadline {
                Some(deadline) => next_tick.min(deadline),
                None => next_tick,
            };
            self.sleep_until(wake);
        }

        let elapsed = started.elapsed();
        info!(
            "monitoring stopped, total runtime: {:.1}s, ticks: {}",
            elapsed.as_secs_f64(),
            ticks
        );
        Ok(ticks)
    }

    /// Sleep in short slices so a stop request shortens the wait instead of
    /// delaying shutdown
    fn sleep_until(&self, target: Instant) {
        while !self.shutdown.is_triggered() {
            let now = Instant::now();
            if now >= target {
                break;
            }
            std::thread::sleep((target - now).min(SLEEP_SLICE));
        }
    }
}
