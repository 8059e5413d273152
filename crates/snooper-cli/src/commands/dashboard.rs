use std::time::Duration;

use snooper_core::{TelemetryConfig, TelemetryOrchestrator};

pub fn run(refresh_ms: u64, history: usize, show_identifiers: bool) {
    let orch = TelemetryOrchestrator::native(TelemetryConfig::revealing(show_identifiers));
    let mut app = match crate::tui::app::App::new(orch, Duration::from_millis(refresh_ms), history) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
