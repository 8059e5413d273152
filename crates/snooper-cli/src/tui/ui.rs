//! Dashboard rendering.
//!
//! ┌──────────────────────────────────────────────┐
//! │  snooper   live  #42   every 1000ms          │
//! ├──────────────────────┬───────────────────────┤
//! │  CPU 37.5%           │  GPU 12.0%  48.5°C    │
//! │  ╭──────────────     │  ╭──────────────      │
//! │  ╰──────────────     │  ╰──────────────      │
//! ├──────────────────────┼───────────────────────┤
//! │  Machine             │  System               │
//! │  Model  Apple M2 Pro │  Memory  12.3GiB used │
//! ├──────────────────────┴───────────────────────┤
//! │  q: quit   p: pause   c: clear history       │
//! └──────────────────────────────────────────────┘

use super::app::{App, PollStatus};
use crate::format;
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // title
            Constraint::Min(10),    // charts
            Constraint::Length(10), // panels
            Constraint::Length(1),  // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    draw_charts(f, rows[1], app);
    draw_panels(f, rows[2], app);
    draw_keys(f, rows[3]);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let (label, color) = match app.status() {
        _ if app.is_paused() => ("paused".to_string(), Color::Yellow),
        PollStatus::WarmingUp => ("warming up".to_string(), Color::DarkGray),
        PollStatus::Live => ("live".to_string(), Color::Green),
        PollStatus::Failed(e) => (format!("error: {e}"), Color::Red),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" snooper ", Style::default().bold().fg(Color::Cyan)),
            Span::styled(format!(" {label} "), Style::default().bold().fg(color)),
            Span::styled(
                format!(
                    "  #{}  every {}ms ",
                    app.samples(),
                    app.refresh_rate().as_millis()
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

    f.render_widget(block, area);
}

fn draw_charts(f: &mut Frame, area: Rect, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let latest = app.latest();

    let cpu_title = match latest {
        Some(s) => format!(
            " CPU {}  usr {:.1}  sys {:.1} ",
            format::format_percent(s.cpu_used_percent).trim(),
            s.cpu.user,
            s.cpu.system
        ),
        None => " CPU ".to_string(),
    };
    draw_series(f, cols[0], &cpu_title, app.cpu_history(), Color::Green);

    let gpu_title = match latest {
        Some(s) => format!(" GPU {} ", format::format_gpu(&s.gpu).trim()),
        None => " GPU ".to_string(),
    };
    draw_series(f, cols[1], &gpu_title, app.gpu_history(), Color::Magenta);
}

/// Points for a percentage chart, oldest first at x = 0.
fn series_points(history: &snooper_core::RingBuffer) -> Vec<(f64, f64)> {
    history
        .copy_out(history.capacity())
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i as f64, v))
        .collect()
}

fn draw_series(
    f: &mut Frame,
    area: Rect,
    title: &str,
    history: &snooper_core::RingBuffer,
    color: Color,
) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());

    if history.is_empty() {
        let p = Paragraph::new("Waiting for samples")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let points = series_points(history);
    let x_max = (history.capacity().saturating_sub(1)).max(1) as f64;
    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(color))
            .data(&points),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(Axis::default().bounds([0.0, x_max]))
        .y_axis(
            Axis::default()
                .bounds([0.0, 100.0])
                .labels(vec![Span::raw("0"), Span::raw("50"), Span::raw("100")]),
        );
    f.render_widget(chart, area);
}

fn draw_panels(f: &mut Frame, area: Rect, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let identity_lines = match app.identity() {
        Some(id) => labelled(format::identity_rows(id)),
        None => vec![Line::styled(
            "Identity unavailable",
            Style::default().fg(Color::DarkGray),
        )],
    };
    let p = Paragraph::new(identity_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Machine "));
    f.render_widget(p, cols[0]);

    let system_lines = match app.latest() {
        Some(s) => labelled(format::system_rows(&s.system)),
        None => vec![Line::styled(
            "Waiting for first snapshot",
            Style::default().fg(Color::DarkGray),
        )],
    };
    let p = Paragraph::new(system_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" System "));
    f.render_widget(p, cols[1]);
}

fn labelled(rows: Vec<(&'static str, String)>) -> Vec<Line<'static>> {
    rows.into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{label:<14}"), Style::default().fg(Color::Cyan)),
                Span::raw(value),
            ])
        })
        .collect()
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(" q: quit   p: pause   c: clear history")
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
