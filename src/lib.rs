//! # gpumon
//!
//! GPU usage monitoring with CSV logging for ML workstations. gpumon polls
//! per-device utilization, memory, temperature, and power metrics on a
//! fixed interval and appends one row per device to a CSV file, until a
//! duration limit elapses or the operator interrupts the run.
//!
//! Two query backends implement the same interface and are probed once at
//! startup: native NVML bindings (feature `nvidia`) and an `nvidia-smi`
//! fallback that parses the tool's CSV output.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use gpumon::{detect_backend, Monitor, MonitorConfig, ShutdownFlag};
//!
//! # fn main() -> gpumon::Result<()> {
//! let config = MonitorConfig {
//!     output_path: "gpu_usage.csv".into(),
//!     interval: Duration::from_secs(30),
//!     duration: Some(Duration::from_secs(2 * 3600)),
//! };
//!
//! let shutdown = ShutdownFlag::new();
//! #[cfg(unix)]
//! shutdown.install_signal_handlers()?;
//!
//! let mut monitor = Monitor::new(config, detect_backend(), shutdown);
//! let ticks = monitor.run()?;
//! println!("recorded {} ticks", ticks);
//! # Ok(())
//! # }
//! ```
//!
//! ## One-shot queries
//!
//! ```no_run
//! use gpumon::{detect_backend, GpuQuery};
//!
//! # fn main() -> gpumon::Result<()> {
//! let backend = detect_backend();
//! for snapshot in backend.query()? {
//!     println!("{}", snapshot.summary());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `nvidia` - NVML support via `nvml-wrapper`; without it (or when the
//!   driver library is missing at runtime) gpumon shells out to
//!   `nvidia-smi`

pub mod error;
pub mod monitor;
pub mod query;
pub mod shutdown;
pub mod sink;
pub mod snapshot;

pub use error::{MonitorError, Result};
pub use monitor::{Monitor, MonitorConfig};
pub use query::{detect_backend, GpuQuery, SmiQuery};
pub use shutdown::ShutdownFlag;
pub use sink::{CsvSink, CSV_HEADER};
pub use snapshot::DeviceSnapshot;

#[cfg(feature = "nvidia")]
pub use query::NvmlQuery;
