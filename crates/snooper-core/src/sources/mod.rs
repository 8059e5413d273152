//! Data sources behind the probes.
//!
//! The probes only see these narrow traits. [`native()`] picks the readers
//! for the running platform; tests substitute in-memory fakes.

pub mod helpers;
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;

use crate::accelerator::AcceleratorStats;
use crate::cpu::TickSample;
use crate::error::{Result, SnoopError};
use crate::identity::IdentitySnapshot;
use crate::metrics::SystemMetrics;

/// Timestamped per-core cumulative tick counters.
pub trait TickSource: Send {
    fn read(&self) -> Result<TickSample>;
}

/// Raw accelerator performance counters. Keys vary by driver.
pub trait AcceleratorStatsSource: Send {
    fn read(&self) -> Result<AcceleratorStats>;
}

/// Static machine identity, unmasked.
pub trait IdentitySource: Send {
    fn read(&self) -> Result<IdentitySnapshot>;

    /// Read and apply the masking policy: serial number and hardware UUID are
    /// masked unless `reveal_identifiers` is set.
    fn read_with_policy(&self, reveal_identifiers: bool) -> Result<IdentitySnapshot> {
        Ok(self.read()?.with_policy(reveal_identifiers))
    }
}

/// Best-effort host metrics. Missing groups are `None`, never an error.
pub trait SystemMetricsSource: Send {
    fn read(&self) -> SystemMetrics;
}

/// One reader per concern, as consumed by the orchestrator.
pub struct Sources {
    pub ticks: Box<dyn TickSource>,
    pub accelerator: Box<dyn AcceleratorStatsSource>,
    pub identity: Box<dyn IdentitySource>,
    pub system: Box<dyn SystemMetricsSource>,
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources").finish_non_exhaustive()
    }
}

/// Readers for the current platform.
#[cfg(target_os = "macos")]
pub fn native() -> Sources {
    Sources {
        ticks: Box::new(macos::MachTicks),
        accelerator: Box::new(macos::IoregAccelerator),
        identity: Box::new(macos::SysctlIdentity),
        system: Box::new(macos::MacSystemMetrics),
    }
}

/// Readers for the current platform.
#[cfg(target_os = "linux")]
pub fn native() -> Sources {
    Sources {
        ticks: Box::new(linux::ProcStatTicks::default()),
        accelerator: Box::new(linux::DrmAccelerator::default()),
        identity: Box::new(linux::LinuxIdentity::default()),
        system: Box::new(linux::LinuxSystemMetrics::default()),
    }
}

/// Readers for the current platform.
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn native() -> Sources {
    Sources {
        ticks: Box::new(Unsupported),
        accelerator: Box::new(Unsupported),
        identity: Box::new(Unsupported),
        system: Box::new(Unsupported),
    }
}

/// Stand-in for platforms without a native reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

fn unsupported() -> SnoopError {
    SnoopError::unavailable(format!(
        "no native reader for {}",
        std::env::consts::OS
    ))
}

impl TickSource for Unsupported {
    fn read(&self) -> Result<TickSample> {
        Err(unsupported())
    }
}

impl AcceleratorStatsSource for Unsupported {
    fn read(&self) -> Result<AcceleratorStats> {
        Err(unsupported())
    }
}

impl IdentitySource for Unsupported {
    fn read(&self) -> Result<IdentitySnapshot> {
        Err(unsupported())
    }
}

impl SystemMetricsSource for Unsupported {
    fn read(&self) -> SystemMetrics {
        SystemMetrics::default()
    }
}
