use snooper_core::{TelemetryConfig, TelemetryOrchestrator};

use super::{OutputFormat, PollPlan, emit, exit_on_error, poll};
use crate::format;

pub fn run(plan: PollPlan, output: OutputFormat) {
    let mut orch = TelemetryOrchestrator::native(TelemetryConfig::default());
    exit_on_error(poll(
        plan,
        || orch.sample_cpu(),
        |report| emit(output, &report, format::usage_table),
    ));
}
