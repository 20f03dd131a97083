use std::collections::VecDeque;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use crate::events::{ServerEvent, Severity};
use crate::server::ServerStats;

const MAX_LOG_LINES: usize = 200;

pub struct TuiState {
    log: VecDeque<(Severity, String)>,
    show_routine: bool,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            log: VecDeque::with_capacity(MAX_LOG_LINES),
            show_routine: false,
        }
    }

    pub fn record(&mut self, event: &ServerEvent) {
        if event.is_routine() && !self.show_routine {
            return;
        }
        self.push(event.severity(), event.describe());
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message.into());
    }

    pub fn toggle_routine(&mut self) {
        self.show_routine = !self.show_routine;
        let state = if self.show_routine { "shown" } else { "hidden" };
        self.log_info(format!("routine events {state}"));
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }

    fn push(&mut self, severity: Severity, line: String) {
        if self.log.len() >= MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back((severity, line));
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, stats: &ServerStats) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(stats.players.len() as u16 + 2),
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], stats);
    render_hazards(frame, chunks[1], stats);
    render_players(frame, chunks[2], stats);
    render_network(frame, chunks[3], stats);
    render_log(frame, chunks[4], state);
    render_help(frame, chunks[5]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let title = format!(" Ashfall Arena - Uptime: {} ", format_duration(stats.uptime_secs));

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = format!(
        "Tick: {}  |  Sim: {:.1}s  |  Observers: {}  |  Entities: {}  |  Wave: {}",
        stats.tick, stats.sim_time, stats.observers, stats.entity_count, stats.waves
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_hazards(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(format!(
            " Drones alive: {}  |  Peak power: {:.0} ",
            stats.drones_alive, stats.peak_power
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let ratio = if stats.barrels_total == 0 {
        0.0
    } else {
        stats.barrels_intact as f64 / stats.barrels_total as f64
    };
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Yellow))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!(
            "{}/{} barrels intact",
            stats.barrels_intact, stats.barrels_total
        ));

    frame.render_widget(gauge, area);
}

fn render_players(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Players ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let lines: Vec<Line> = stats
        .players
        .iter()
        .map(|player| {
            let health_color = if player.health <= 0.0 {
                Color::DarkGray
            } else if player.health < 40.0 {
                Color::Red
            } else {
                Color::White
            };
            Line::from(vec![
                Span::styled(
                    format!("P{:<3}", player.participant.0),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    format!("hp {:>5.0}  ", player.health),
                    Style::default().fg(health_color),
                ),
                Span::styled(
                    format!("ammo {:>2}/{:<3}", player.loaded, player.reserve),
                    Style::default().fg(Color::White),
                ),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_network(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Loopback ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let down = &stats.downstream;
    let up = &stats.upstream;
    let lines = vec![
        Line::from(vec![
            Span::styled("Diffs: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} sent / {} delivered, {} ({:.0}B avg)",
                    down.packets_sent,
                    down.packets_received,
                    format_bytes(down.bytes_sent),
                    down.average_packet_size()
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Requests: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} sent / {} delivered, {}",
                    up.packets_sent,
                    up.packets_received,
                    format_bytes(up.bytes_sent)
                ),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Events ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.log.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .log
        .iter()
        .skip(skip)
        .map(|(severity, text)| {
            let color = match severity {
                Severity::Info => Color::White,
                Severity::Notice => Color::Yellow,
                Severity::Warn => Color::Red,
            };
            Line::from(Span::styled(text.as_str(), Style::default().fg(color)))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("q/ESC quit  |  r toggle routine events  |  c clear log")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
