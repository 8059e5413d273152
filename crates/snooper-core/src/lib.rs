//! # snooper-core
//!
//! Hardware telemetry sampling for a single host: CPU utilization from
//! cumulative tick counters, accelerator utilization and thermal state from
//! driver performance statistics, and static machine identity.
//!
//! ## Quick Start
//!
//! ```no_run
//! use snooper_core::{Sampled, TelemetryConfig, TelemetryOrchestrator, DEFAULT_INTERVAL};
//!
//! let mut orch = TelemetryOrchestrator::native(TelemetryConfig::default());
//! loop {
//!     match orch.collect_snapshot()? {
//!         Sampled::Warmup => std::thread::sleep(DEFAULT_INTERVAL),
//!         Sampled::Ready(snap) => {
//!             println!("cpu {:.1}%  gpu {:.1}%", snap.cpu_used_percent, snap.gpu.utilization_percent);
//!             break;
//!         }
//!     }
//! }
//! # Ok::<(), snooper_core::SnoopError>(())
//! ```
//!
//! ## Architecture
//!
//! Sources → Probes → Orchestrator → Snapshot → RingBuffer (charts)
//!
//! - [`CpuUsageProbe`] keeps one previous [`TickSample`] and reports deltas.
//! - [`AcceleratorProbe`] walks an ordered key table over a counter map.
//! - [`TelemetryOrchestrator`] merges both with identity loaded once and
//!   best-effort [`SystemMetrics`].
//! - [`RingBuffer`] stores the most recent values of one series.
//!
//! Platform readers live in [`sources`] behind narrow traits, so every probe
//! can be driven from fixtures. Nothing here spawns threads or sleeps; the
//! caller owns the cadence.

pub mod accelerator;
pub mod config;
pub mod cpu;
pub mod error;
pub mod history;
pub mod identity;
pub mod metrics;
pub mod sources;
pub mod telemetry;
pub mod time;

pub use accelerator::{
    AcceleratorProbe, AcceleratorSample, AcceleratorStats, StatValue, ThermalReading,
    UTILIZATION_KEYS, UtilizationKey,
};
pub use config::{DEFAULT_HISTORY_CAPACITY, DEFAULT_INTERVAL, TelemetryConfig};
pub use cpu::{CoreTicks, CpuUsage, CpuUsageProbe, TickSample, UsageReport, usage_between};
pub use error::{Result, Sampled, SnoopError};
pub use history::RingBuffer;
pub use identity::{IdentityField, IdentitySnapshot, mask};
pub use metrics::{LoadAverages, MemoryUsage, SystemMetrics};
pub use sources::{
    AcceleratorStatsSource, IdentitySource, Sources, SystemMetricsSource, TickSource,
};
pub use telemetry::{Snapshot, TelemetryOrchestrator};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
