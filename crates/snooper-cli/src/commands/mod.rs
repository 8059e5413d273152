pub mod cpu;
pub mod dashboard;
pub mod gpu;
pub mod info;
pub mod watch;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use snooper_core::{Sampled, SnoopError};

/// How sampled values are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    /// Pretty-printed JSON document per sample.
    Json,
    /// One compact JSON object per line.
    Ndjson,
}

impl OutputFormat {
    pub fn from_flags(json: bool, ndjson: bool) -> Self {
        match (json, ndjson) {
            (_, true) => Self::Ndjson,
            (true, false) => Self::Json,
            (false, false) => Self::Table,
        }
    }

    pub fn is_table(self) -> bool {
        self == Self::Table
    }
}

/// Write `value` as JSON/NDJSON, or fall back to the given table lines.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, table: impl FnOnce(&T) -> Vec<String>) {
    let rendered = match format {
        OutputFormat::Table => Ok(table(value).join("\n")),
        OutputFormat::Json => serde_json::to_string_pretty(value),
        OutputFormat::Ndjson => serde_json::to_string(value),
    };
    match rendered {
        Ok(text) => println!("{text}"),
        Err(e) => log::error!("failed to serialize output: {e}"),
    }
}

/// Cadence for a polling command.
#[derive(Debug, Clone, Copy)]
pub struct PollPlan {
    pub interval: Duration,
    /// Keep polling after the first result.
    pub repeat: bool,
    /// Stop after this many results.
    pub count: Option<u64>,
}

impl PollPlan {
    /// `--watch <ms>` polls forever (or `count` times); without it a single
    /// result is produced after warmup at the default cadence.
    pub fn from_args(watch_ms: Option<u64>, count: Option<u64>) -> Self {
        Self {
            interval: watch_ms
                .map(Duration::from_millis)
                .unwrap_or(snooper_core::DEFAULT_INTERVAL),
            repeat: watch_ms.is_some(),
            count,
        }
    }

    fn done(&self, produced: u64) -> bool {
        if !self.repeat {
            return produced >= 1;
        }
        self.count.is_some_and(|c| produced >= c)
    }
}

/// Ctrl+C flips the returned flag to `false`.
pub fn install_stop_flag() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        log::warn!("could not install Ctrl+C handler: {e}");
    }
    running
}

fn sleep_while_running(interval: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}

/// Drive `sample` at the plan's cadence, handing every ready result to
/// `on_ready`. Warmup results are retried silently after one interval.
///
/// When repeating, `Unavailable` is reported and the next interval retried;
/// any other error, or any error in one-shot mode, ends the loop.
pub fn poll<T>(
    plan: PollPlan,
    mut sample: impl FnMut() -> snooper_core::Result<Sampled<T>>,
    mut on_ready: impl FnMut(T),
) -> snooper_core::Result<u64> {
    let running = install_stop_flag();
    let mut produced = 0u64;

    while running.load(Ordering::SeqCst) {
        match sample() {
            Ok(Sampled::Warmup) => log::debug!("warming up, retrying in {:?}", plan.interval),
            Ok(Sampled::Ready(value)) => {
                on_ready(value);
                produced += 1;
                if plan.done(produced) {
                    break;
                }
            }
            Err(e @ SnoopError::Unavailable(_)) if plan.repeat => {
                log::warn!("sample skipped: {e}");
            }
            Err(e) => return Err(e),
        }
        sleep_while_running(plan.interval, &running);
    }

    Ok(produced)
}

/// Print an error and exit non-zero, like every command does on failure.
pub fn exit_on_error<T>(result: snooper_core::Result<T>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
