//! Per-device measurement records

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One measurement of one device at one instant.
///
/// A snapshot is built fresh by a query backend on every tick and consumed
/// exactly once by the CSV sink; nothing is retained across ticks, the
/// output file is the durable history. Metrics the device or driver cannot
/// measure are `None`, never zero, so "unsupported" and "measured as zero"
/// stay distinguishable downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Device index as reported by the driver (0-based)
    pub gpu_id: u32,
    /// Device name/model (e.g. "NVIDIA GeForce RTX 4090")
    pub name: String,
    /// Compute utilization percentage (0-100)
    pub gpu_utilization: Option<f64>,
    /// Memory in use in MiB
    pub memory_used_mb: f64,
    /// Total memory in MiB
    pub memory_total_mb: f64,
    /// Free memory in MiB
    pub memory_free_mb: f64,
    /// Memory utilization percentage, used / total * 100
    pub memory_utilization: f64,
    /// Core temperature in Celsius
    pub temperature_c: Option<f64>,
    /// Current power draw in Watts
    pub power_draw_w: Option<f64>,
    /// Enforced power limit in Watts
    pub power_limit_w: Option<f64>,
    /// Capture instant
    pub timestamp: DateTime<Local>,
}

impl DeviceSnapshot {
    /// Memory utilization derived from used and total; 0 when total is 0
    pub fn derive_memory_utilization(used_mb: f64, total_mb: f64) -> f64 {
        if total_mb > 0.0 {
            used_mb / total_mb * 100.0
        } else {
            0.0
        }
    }

    /// One-line human summary for the tick log
    pub fn summary(&self) -> String {
        let util = self
            .gpu_utilization
            .map(|u| format!("{}%", u))
            .unwrap_or_else(|| "n/a".to_string());
        let temp = self
            .temperature_c
            .map(|t| format!("{}°C", t))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "GPU{}: {} util, {:.1}% mem, {}",
            self.gpu_id, util, self.memory_utilization, temp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeviceSnapshot {
        DeviceSnapshot {
            gpu_id: 0,
            name: "NVIDIA GeForce RTX 4090".to_string(),
            gpu_utilization: Some(57.0),
            memory_used_mb: 8192.0,
            memory_total_mb: 24564.0,
            memory_free_mb: 16372.0,
            memory_utilization: DeviceSnapshot::derive_memory_utilization(8192.0, 24564.0),
            temperature_c: Some(61.0),
            power_draw_w: Some(285.13),
            power_limit_w: Some(450.0),
            timestamp: Local::now(),
        }
    }

    #[test]
    fn memory_utilization_is_used_over_total() {
        let util = DeviceSnapshot::derive_memory_utilization(8192.0, 24564.0);
        assert!((util - 8192.0 / 24564.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_total_memory_yields_zero_utilization() {
        assert_eq!(DeviceSnapshot::derive_memory_utilization(0.0, 0.0), 0.0);
    }

    #[test]
    fn summary_shows_measured_metrics() {
        let line = sample().summary();
        assert!(line.starts_with("GPU0: 57% util"));
        assert!(line.contains("33.3% mem"));
        assert!(line.ends_with("61°C"));
    }

    #[test]
    fn summary_marks_unsupported_metrics() {
        let mut snap = sample();
        snap.gpu_utilization = None;
        snap.temperature_c = None;
        let line = snap.summary();
        assert!(line.contains("n/a util"));
        assert!(line.ends_with("n/a"));
    }
}
