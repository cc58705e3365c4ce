use std::collections::VecDeque;
use std::io::{self, stdout, Stdout};

use chrono::Local;
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::state::{top_hits, AppState};
use crate::types::{ThresholdAlert, TrafficStats};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// 時刻表示の書式（RFC1123相当）
const TIME_LAYOUT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// 画面に常時表示する監視設定
#[derive(Debug, Clone, Copy)]
pub struct UiOpts {
    pub refresh: u64,
    pub threshold: u64,
    pub window: u64,
}

pub fn init() -> io::Result<Tui> {
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore() -> io::Result<()> {
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// アプリケーションのUI全体を描画
pub fn ui(f: &mut Frame, opts: &UiOpts, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Length(5),
            Constraint::Min(1),
        ])
        .split(f.area());

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    render_traffic_pane(f, top[0], &state.latest_stats);
    render_config_pane(f, top[1], opts);

    render_alerts_pane(f, rows[1], &state.alerts);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);
    render_sections_pane(f, bottom[0], &state.latest_stats);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(bottom[1]);
    render_status_pane(f, right[0], &state.latest_stats);
    render_methods_pane(f, right[1], &state.latest_stats);
}

fn render_traffic_pane(f: &mut Frame, area: Rect, stats: &Option<TrafficStats>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Traffic")
        .border_style(Style::default().fg(Color::Blue));

    let text = match stats {
        Some(s) => format!(
            "Total requests: {}\nBytes transferred: {}",
            s.total_requests, s.total_bytes
        ),
        None => "waiting for inputs...".to_string(),
    };

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn render_config_pane(f: &mut Frame, area: Rect, opts: &UiOpts) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Monitor setup values")
        .border_style(Style::default().fg(Color::Yellow));

    let text = format!(
        "Current time: {}\nRefresh interval: {}s\nAlert threshold: {}req/s\nAlert window: {}s\n(Press 'q' to quit)",
        Local::now().format(TIME_LAYOUT),
        opts.refresh,
        opts.threshold,
        opts.window,
    );

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn render_alerts_pane(f: &mut Frame, area: Rect, alerts: &VecDeque<ThresholdAlert>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Alerts")
        .border_style(Style::default().fg(Color::Magenta));

    if alerts.is_empty() {
        f.render_widget(Paragraph::new("no alerts triggered").block(block), area);
        return;
    }

    // 先頭（最新）が現在の状態。発生中は赤、回復済みは緑で区別する
    let items: Vec<ListItem> = alerts.iter().map(|a| ListItem::new(alert_line(a))).collect();
    f.render_widget(List::new(items).block(block), area);
}

fn alert_line(alert: &ThresholdAlert) -> Line<'static> {
    if alert.is_open {
        Line::from(vec![
            Span::styled("!! ", Style::default().fg(Color::Red)),
            Span::raw(format!(
                "High traffic generated an alert - hits = {:.2}req/s - triggered at {}",
                alert.rate,
                alert.at.format(TIME_LAYOUT)
            )),
        ])
        .style(Style::default().fg(Color::Red))
    } else {
        Line::from(vec![
            Span::styled("OK ", Style::default().fg(Color::Green)),
            Span::raw(format!(
                "High traffic alert recovered - hits = {:.2}req/s - recovered at {}",
                alert.rate,
                alert.at.format(TIME_LAYOUT)
            )),
        ])
        .style(Style::default().fg(Color::Green))
    }
}

fn render_sections_pane(f: &mut Frame, area: Rect, stats: &Option<TrafficStats>) {
    render_top_list_pane(
        f,
        area,
        "Top 20 sections",
        Color::Cyan,
        stats.as_ref().map(|s| top_hits(&s.section_hits, 20)),
    );
}

fn render_status_pane(f: &mut Frame, area: Rect, stats: &Option<TrafficStats>) {
    render_top_list_pane(
        f,
        area,
        "HTTP response status",
        Color::Green,
        stats.as_ref().map(|s| top_hits(&s.status_class_hits, 10)),
    );
}

fn render_methods_pane(f: &mut Frame, area: Rect, stats: &Option<TrafficStats>) {
    render_top_list_pane(
        f,
        area,
        "HTTP request methods",
        Color::Green,
        stats.as_ref().map(|s| top_hits(&s.method_hits, 10)),
    );
}

fn render_top_list_pane(
    f: &mut Frame,
    area: Rect,
    title: &str,
    color: Color,
    ranked: Option<Vec<(String, u64)>>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(Style::default().fg(color));

    let items: Vec<ListItem> = match ranked {
        Some(ranked) => ranked
            .into_iter()
            .map(|(key, hits)| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{hits:>6}"), Style::default().fg(Color::Blue)),
                    Span::raw(" - "),
                    Span::raw(key),
                ]))
            })
            .collect(),
        None => vec![ListItem::new("waiting for inputs...")],
    };

    f.render_widget(List::new(items).block(block), area);
}
