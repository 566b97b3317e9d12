//! Native NVML query backend
//!
//! Preferred backend when the `nvidia` feature is enabled and the driver
//! library loads. Reports the same snapshot shape as the nvidia-smi
//! fallback: memory in MiB, power in Watts, unsupported metrics as `None`.

use chrono::Local;
use log::warn;
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;

use crate::error::{MonitorError, Result};
use crate::query::GpuQuery;
use crate::snapshot::DeviceSnapshot;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Query backend using the NVIDIA Management Library
pub struct NvmlQuery {
    nvml: Nvml,
}

impl NvmlQuery {
    /// Initialize NVML; fails when the driver library is absent
    pub fn init() -> Result<Self> {
        let nvml = Nvml::init()
            .map_err(|e| MonitorError::Initialization(format!("NVML: {}", e)))?;
        Ok(Self { nvml })
    }

    fn snapshot_device(&self, index: u32) -> Result<DeviceSnapshot> {
        let device = self.nvml.device_by_index(index)?;

        let name = device.name()?;
        let memory = device.memory_info()?;
        let memory_used_mb = memory.used as f64 / BYTES_PER_MIB;
        let memory_total_mb = memory.total as f64 / BYTES_PER_MIB;
        let memory_free_mb = memory.free as f64 / BYTES_PER_MIB;

        Ok(DeviceSnapshot {
            gpu_id: index,
            name,
            gpu_utilization: device.utilization_rates().ok().map(|u| u.gpu as f64),
            memory_used_mb,
            memory_total_mb,
            memory_free_mb,
            memory_utilization: DeviceSnapshot::derive_memory_utilization(
                memory_used_mb,
                memory_total_mb,
            ),
            temperature_c: device
                .temperature(TemperatureSensor::Gpu)
                .ok()
                .map(|t| t as f64),
            power_draw_w: device.power_usage().ok().map(|mw| mw as f64 / 1000.0),
            power_limit_w: device
                .power_management_limit()
                .ok()
                .map(|mw| mw as f64 / 1000.0),
            timestamp: Local::now(),
        })
    }
}

impl GpuQuery for NvmlQuery {
    fn query(&self) -> Result<Vec<DeviceSnapshot>> {
        let count = self.nvml.device_count()?;

        let mut snapshots = Vec::with_capacity(count as usize);
        for index in 0..count {
            match self.snapshot_device(index) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!("skipping device {}: {}", index, e),
            }
        }

        Ok(snapshots)
    }

    fn name(&self) -> &'static str {
        "nvml"
    }
}
