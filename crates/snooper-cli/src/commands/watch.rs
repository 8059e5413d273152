use snooper_core::{TelemetryConfig, TelemetryOrchestrator};

use super::{OutputFormat, PollPlan, emit, exit_on_error, poll};
use crate::format;

pub fn run(plan: PollPlan, output: OutputFormat, show_identifiers: bool) {
    let mut orch = TelemetryOrchestrator::native(TelemetryConfig::revealing(show_identifiers));

    if output.is_table() {
        match orch.identity() {
            Some(id) => {
                for (label, value) in format::identity_rows(id) {
                    println!("{label:<14} {value}");
                }
            }
            None => println!("Identity       {}", snooper_core::identity::UNAVAILABLE),
        }
        println!();
    }

    exit_on_error(poll(
        plan,
        || orch.collect_snapshot(),
        |snap| emit(output, &snap, |s| vec![format::snapshot_line(s)]),
    ));
}
