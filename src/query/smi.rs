//! nvidia-smi query backend
//!
//! Shell fallback used when the NVML bindings are not compiled in or fail
//! to initialize. Depends only on nvidia-smi's documented CSV output shape
//! (`--format=csv,noheader,nounits`), not on any library binding.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use chrono::Local;
use log::error;

use crate::error::{MonitorError, Result};
use crate::query::GpuQuery;
use crate::snapshot::DeviceSnapshot;

/// Fields requested from nvidia-smi, in CSV column order
const QUERY_FIELDS: &str =
    "index,name,utilization.gpu,memory.used,memory.total,memory.free,temperature.gpu,power.draw,power.limit";

/// Sentinels nvidia-smi prints for metrics the device cannot measure
const UNSUPPORTED_SENTINELS: [&str; 2] = ["[Not Supported]", "[N/A]"];

/// Bound on one nvidia-smi invocation
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll step while waiting for the child to exit
const WAIT_STEP: Duration = Duration::from_millis(50);

/// Query backend that shells out to nvidia-smi
pub struct SmiQuery {
    command: String,
}

impl SmiQuery {
    pub fn new() -> Self {
        Self {
            command: "nvidia-smi".to_string(),
        }
    }

    /// Use a different executable (tests point this at a stub)
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Run the tool once and return its stdout.
    ///
    /// The child is killed if it outlives [`COMMAND_TIMEOUT`]. Output is
    /// read after exit; the CSV report is far below the pipe buffer size.
    fn run_tool(&self) -> Result<String> {
        let mut child = Command::new(&self.command)
            .arg(format!("--query-gpu={}", QUERY_FIELDS))
            .arg("--format=csv,noheader,nounits")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MonitorError::CommandFailed(format!("{}: {}", self.command, e)))?;

        let deadline = Instant::now() + COMMAND_TIMEOUT;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(MonitorError::CommandTimeout(self.command.clone()));
                    }
                    std::thread::sleep(WAIT_STEP);
                }
            }
        };

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)?;
        }

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                let _ = err.read_to_string(&mut stderr);
            }
            return Err(MonitorError::CommandFailed(format!(
                "{} exited with {}: {}",
                self.command,
                status,
                stderr.trim()
            )));
        }

        Ok(stdout)
    }
}

impl Default for SmiQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuQuery for SmiQuery {
    fn query(&self) -> Result<Vec<DeviceSnapshot>> {
        Ok(parse_batch(&self.run_tool()?))
    }

    fn name(&self) -> &'static str {
        "nvidia-smi"
    }
}

/// Parse one query response, one device per line.
///
/// A malformed line is logged and skipped; well-formed lines in the same
/// batch are still returned.
fn parse_batch(stdout: &str) -> Vec<DeviceSnapshot> {
    let mut snapshots = Vec::new();
    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => error!("skipping malformed nvidia-smi line: {}", e),
        }
    }
    snapshots
}

/// Parse one CSV line into a snapshot.
///
/// Unsupported-metric sentinels map to `None` for exactly that field.
/// Memory utilization is computed here since it needs used and total from
/// the same line.
fn parse_line(line: &str) -> Result<DeviceSnapshot> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() != 9 {
        return Err(MonitorError::Parse(format!(
            "expected 9 fields, got {}: {:?}",
            parts.len(),
            line
        )));
    }

    let gpu_id = parts[0]
        .parse::<u32>()
        .map_err(|_| MonitorError::Parse(format!("bad device index {:?}", parts[0])))?;
    let memory_used_mb = parse_required(parts[3], "memory.used")?;
    let memory_total_mb = parse_required(parts[4], "memory.total")?;
    let memory_free_mb = parse_required(parts[5], "memory.free")?;

    Ok(DeviceSnapshot {
        gpu_id,
        name: parts[1].to_string(),
        gpu_utilization: parse_optional(parts[2], "utilization.gpu")?,
        memory_used_mb,
        memory_total_mb,
        memory_free_mb,
        memory_utilization: DeviceSnapshot::derive_memory_utilization(
            memory_used_mb,
            memory_total_mb,
        ),
        temperature_c: parse_optional(parts[6], "temperature.gpu")?,
        power_draw_w: parse_optional(parts[7], "power.draw")?,
        power_limit_w: parse_optional(parts[8], "power.limit")?,
        timestamp: Local::now(),
    })
}

fn parse_required(value: &str, field: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| MonitorError::Parse(format!("bad {} value {:?}", field, value)))
}

fn parse_optional(value: &str, field: &str) -> Result<Option<f64>> {
    if UNSUPPORTED_SENTINELS.contains(&value) {
        return Ok(None);
    }
    parse_required(value, field).map(Some)
}
