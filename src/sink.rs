//! CSV sink for device snapshots
//!
//! The output file is the run's sole durable artifact. The header is
//! written exactly once at initialization; after that the file is strictly
//! append-only, and every append flushes before returning so a kill between
//! ticks never loses a completed row.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;
use crate::snapshot::DeviceSnapshot;

/// Fixed CSV header, one column per snapshot field
pub const CSV_HEADER: &str = "timestamp,gpu_id,name,gpu_utilization,memory_used_mb,memory_total_mb,memory_free_mb,memory_utilization,temperature_c,power_draw_w,power_limit_w";

/// Timestamp rendering for the first column (ISO-8601, local time)
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Append-only CSV writer
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Create the output file, truncating any prior contents, and write the
    /// header row. Missing parent directories are created.
    pub fn initialize(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "{}", CSV_HEADER)?;
        writer.flush()?;
        info!("CSV initialized: {}", path.display());

        Ok(Self { path, writer })
    }

    /// Append one row per snapshot, preserving input order, flushing before
    /// returning
    pub fn append(&mut self, snapshots: &[DeviceSnapshot]) -> Result<()> {
        for snapshot in snapshots {
            writeln!(self.writer, "{}", format_row(snapshot))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Render one snapshot as a CSV row; absent metrics become empty cells so
/// the file stays machine-parseable
fn format_row(snapshot: &DeviceSnapshot) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{}",
        snapshot.timestamp.format(TIMESTAMP_FORMAT),
        snapshot.gpu_id,
        snapshot.name,
        optional_cell(snapshot.gpu_utilization),
        snapshot.memory_used_mb,
        snapshot.memory_total_mb,
        snapshot.memory_free_mb,
        snapshot.memory_utilization,
        optional_cell(snapshot.temperature_c),
        optional_cell(snapshot.power_draw_w),
        optional_cell(snapshot.power_limit_w),
    )
}

fn optional_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn sample(gpu_id: u32) -> DeviceSnapshot {
        DeviceSnapshot {
            gpu_id,
            name: format!("GPU {}", gpu_id),
            gpu_utilization: Some(50.0),
            memory_used_mb: 1000.0,
            memory_total_mb: 4000.0,
            memory_free_mb: 3000.0,
            memory_utilization: 25.0,
            temperature_c: Some(60.0),
            power_draw_w: Some(120.5),
            power_limit_w: Some(250.0),
            timestamp: Local::now(),
        }
    }

    #[test]
    fn header_once_then_rows_in_call_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpu_usage.csv");

        let mut sink = CsvSink::initialize(&path).unwrap();
        sink.append(&[sample(0)]).unwrap();
        sink.append(&[sample(1), sample(2)]).unwrap();
        drop(sink);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_HEADER);
        for (line, gpu_id) in lines[1..].iter().zip(["0", "1", "2"]) {
            assert_eq!(line.split(',').nth(1), Some(gpu_id));
        }
    }

    #[test]
    fn reinitialize_truncates_prior_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpu_usage.csv");

        let mut sink = CsvSink::initialize(&path).unwrap();
        sink.append(&[sample(0)]).unwrap();
        drop(sink);

        let sink = CsvSink::initialize(&path).unwrap();
        drop(sink);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn missing_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/nested/gpu_usage.csv");

        let mut sink = CsvSink::initialize(&path).unwrap();
        sink.append(&[sample(0)]).unwrap();
        assert_eq!(sink.path(), path);
        assert!(path.is_file());
    }

    #[test]
    fn absent_metrics_serialize_as_empty_cells() {
        let mut snap = sample(0);
        snap.gpu_utilization = None;
        snap.power_draw_w = None;
        snap.power_limit_w = None;

        let row = format_row(&snap);
        let cells: Vec<&str> = row.split(',').collect();
        assert_eq!(cells.len(), 11);
        assert_eq!(cells[3], "");
        assert_eq!(cells[9], "");
        assert_eq!(cells[10], "");
        // Measured neighbours keep their values.
        assert_eq!(cells[8], "60");
    }

    #[test]
    fn timestamp_cell_is_iso8601() {
        let row = format_row(&sample(0));
        let stamp = row.split(',').next().unwrap();
        assert_eq!(stamp.len(), "2026-08-06T12:34:56.123456".len());
        assert_eq!(stamp.as_bytes()[10], b'T');
    }
}
