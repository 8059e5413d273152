//! Orchestrator configuration and shared defaults.

use std::time::Duration;

/// Samples retained per chart series.
pub const DEFAULT_HISTORY_CAPACITY: usize = 120;

/// Sampling cadence used when the caller does not pick one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Settings recognised by [`TelemetryOrchestrator`](crate::TelemetryOrchestrator).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Show serial number and hardware UUID in full. Masked when `false`.
    pub reveal_identifiers: bool,
}

impl TelemetryConfig {
    pub fn revealing(reveal_identifiers: bool) -> Self {
        Self { reveal_identifiers }
    }
}
