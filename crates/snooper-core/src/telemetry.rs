//! Snapshot composition.
//!
//! [`TelemetryOrchestrator`] owns one CPU probe, one accelerator probe and the
//! identity read at construction. Each [`collect_snapshot`] call merges a fresh
//! CPU delta with best-effort accelerator and system readings. Only the CPU
//! path can fail a call; everything else degrades.
//!
//! [`collect_snapshot`]: TelemetryOrchestrator::collect_snapshot

use std::time::SystemTime;

use serde::Serialize;

use crate::accelerator::{AcceleratorProbe, AcceleratorSample};
use crate::config::TelemetryConfig;
use crate::cpu::{CpuUsage, CpuUsageProbe, UsageReport};
use crate::error::{Result, Sampled};
use crate::identity::IdentitySnapshot;
use crate::metrics::SystemMetrics;
use crate::sources::{self, IdentitySource, Sources, SystemMetricsSource, TickSource};

/// One merged, point-in-time telemetry result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub monotonic_ns: u64,
    #[serde(rename = "wall_unix_ms", serialize_with = "crate::time::serialize_unix_ms")]
    pub wall_time: SystemTime,
    /// `100 - idle` over all cores.
    pub cpu_used_percent: f64,
    pub cpu: CpuUsage,
    pub gpu: AcceleratorSample,
    /// `None` when identity could not be loaded.
    pub identity: Option<IdentitySnapshot>,
    pub system: SystemMetrics,
}

pub struct TelemetryOrchestrator {
    config: TelemetryConfig,
    sources: Sources,
    cpu: CpuUsageProbe,
    accelerator: AcceleratorProbe,
    identity: Option<IdentitySnapshot>,
}

impl std::fmt::Debug for TelemetryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryOrchestrator")
            .field("config", &self.config)
            .field("cpu_primed", &self.cpu.is_primed())
            .field("identity_loaded", &self.identity.is_some())
            .finish_non_exhaustive()
    }
}

impl TelemetryOrchestrator {
    /// Build an orchestrator and load identity once.
    ///
    /// An identity read failure is logged and leaves identity unloaded; it
    /// never fails construction.
    pub fn new(config: TelemetryConfig, sources: Sources) -> Self {
        let identity = match sources.identity.read_with_policy(config.reveal_identifiers) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("machine identity unavailable: {e}");
                None
            }
        };

        Self {
            config,
            sources,
            cpu: CpuUsageProbe::new(),
            accelerator: AcceleratorProbe::new(),
            identity,
        }
    }

    /// Orchestrator over [`sources::native()`].
    pub fn native(config: TelemetryConfig) -> Self {
        Self::new(config, sources::native())
    }

    /// Replace the accelerator key table.
    pub fn with_accelerator_probe(mut self, probe: AcceleratorProbe) -> Self {
        self.accelerator = probe;
        self
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Identity loaded at construction, already masked per the config.
    pub fn identity(&self) -> Option<&IdentitySnapshot> {
        self.identity.as_ref()
    }

    /// Read ticks and feed the CPU probe.
    ///
    /// Shares the probe with [`collect_snapshot`](Self::collect_snapshot), so
    /// either call advances the delta window.
    pub fn sample_cpu(&mut self) -> Result<Sampled<UsageReport>> {
        let ticks = self.sources.ticks.read()?;
        self.cpu.sample(ticks)
    }

    /// Read accelerator counters. A failed read degrades to unavailable.
    pub fn sample_accelerator(&self) -> AcceleratorSample {
        self.accelerator.sample_source(self.sources.accelerator.as_ref())
    }

    pub fn system_metrics(&self) -> SystemMetrics {
        self.sources.system.read()
    }

    /// Compose one snapshot.
    ///
    /// Returns [`Sampled::Warmup`] until the CPU probe has a previous sample;
    /// no partial snapshot is produced. Tick read failures are returned and
    /// leave the probe state untouched.
    pub fn collect_snapshot(&mut self) -> Result<Sampled<Snapshot>> {
        let sampled = self.sample_cpu()?;

        Ok(sampled.map(|report| Snapshot {
            monotonic_ns: report.monotonic_ns,
            wall_time: report.wall_time,
            cpu_used_percent: report.overall.busy(),
            cpu: report.overall,
            gpu: self.sample_accelerator(),
            identity: self.identity.clone(),
            system: self.system_metrics(),
        }))
    }
}
