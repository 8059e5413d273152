//! Dashboard state and event loop.
//!
//! Sampling happens on the UI thread: every refresh interval the orchestrator
//! is polled once and the result pushed into fixed-size histories. Reads are
//! short-lived helper processes or procfs files, so the UI never stalls for
//! long.

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use snooper_core::{RingBuffer, Sampled, Snapshot, TelemetryOrchestrator};

/// What the status line reports about the most recent poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    WarmingUp,
    Live,
    Failed(String),
}

pub struct App {
    orch: TelemetryOrchestrator,
    cpu_history: RingBuffer,
    gpu_history: RingBuffer,
    latest: Option<Snapshot>,
    status: PollStatus,
    refresh_rate: Duration,
    samples: u64,
    paused: bool,
    running: bool,
}

impl App {
    pub fn new(
        orch: TelemetryOrchestrator,
        refresh_rate: Duration,
        history: usize,
    ) -> snooper_core::Result<Self> {
        Ok(Self {
            orch,
            cpu_history: RingBuffer::new(history)?,
            gpu_history: RingBuffer::new(history)?,
            latest: None,
            status: PollStatus::WarmingUp,
            refresh_rate,
            samples: 0,
            paused: false,
            running: true,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal before a panic message is printed.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        result
    }

    fn run_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        self.tick();
        let mut last_tick = Instant::now();

        while self.running {
            terminal.draw(|f| super::ui::draw(f, self))?;

            if event::poll(Duration::from_millis(50))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }

            if last_tick.elapsed() >= self.refresh_rate {
                if !self.paused {
                    self.tick();
                }
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('p') | KeyCode::Char(' ') => self.paused = !self.paused,
            KeyCode::Char('c') => {
                self.cpu_history.clear();
                self.gpu_history.clear();
            }
            _ => {}
        }
    }

    /// Poll the orchestrator once and record the outcome.
    pub fn tick(&mut self) {
        match self.orch.collect_snapshot() {
            Ok(Sampled::Warmup) => self.status = PollStatus::WarmingUp,
            Ok(Sampled::Ready(snap)) => {
                self.cpu_history.push(snap.cpu_used_percent);
                if snap.gpu.available {
                    self.gpu_history.push(snap.gpu.utilization_percent);
                }
                self.latest = Some(snap);
                self.samples += 1;
                self.status = PollStatus::Live;
            }
            Err(e) => {
                log::warn!("dashboard poll failed: {e}");
                self.status = PollStatus::Failed(e.to_string());
            }
        }
    }

    // -- accessors for the renderer --

    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    pub fn identity(&self) -> Option<&snooper_core::IdentitySnapshot> {
        self.orch.identity()
    }

    pub fn cpu_history(&self) -> &RingBuffer {
        &self.cpu_history
    }

    pub fn gpu_history(&self) -> &RingBuffer {
        &self.gpu_history
    }

    pub fn status(&self) -> &PollStatus {
        &self.status
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn refresh_rate(&self) -> Duration {
        self.refresh_rate
    }
}
