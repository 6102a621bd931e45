//! UI rendering for the TUI.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crate::core::job::{ScanJob, ScanStatus};
use crate::db::scans::ScanRow;

use super::app::{NewScanForm, TuiApp, View};

/// Main render function - dispatches to view-specific renderers.
pub fn render(frame: &mut Frame, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer/help
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    match &app.view {
        View::Dashboard { selected } => {
            render_dashboard(frame, app, chunks[1], *selected);
        }
        View::History { selected, .. } => {
            render_history(frame, app, chunks[1], *selected);
        }
        View::Detail { scroll, .. } => {
            render_detail(frame, app, chunks[1], *scroll);
        }
        View::NewScan(form) => {
            render_new_scan(frame, chunks[1], form);
        }
    }

    render_footer(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let status = app.data.daemon_status.as_ref();

    let title = match status {
        Some(s) => {
            let mode = if s.simulation { " [SIM]" } else { "" };
            let uptime = format_duration(s.uptime_secs);
            format!("VSCAND  v{}  Uptime: {}{}", s.version, uptime, mode)
        }
        None => "VSCAND  (connecting...)".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(block, area);
}

fn render_dashboard(frame: &mut Frame, app: &TuiApp, area: Rect, selected: usize) {
    if app.data.active_scan.is_some() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Active scan banner (compact)
                Constraint::Min(0),    // Recent scans (fills remaining space)
            ])
            .split(area);

        render_active_banner(frame, app, chunks[0]);
        render_recent_scans(frame, app, chunks[1], selected);
    } else {
        // No active scan - recent scans get full space
        render_recent_scans(frame, app, area, selected);
    }
}

fn render_active_banner(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let Some(job) = &app.data.active_scan else {
        return;
    };

    let block = Block::default()
        .title("Active Scan")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let paragraph = Paragraph::new(format_active_banner(job)).block(block);
    frame.render_widget(paragraph, area);
}

fn scan_status_icon(status: &str) -> Span<'static> {
    match status {
        "completed" => Span::styled("✓", Style::default().fg(Color::Green)),
        "failed" => Span::styled("✗", Style::default().fg(Color::Red)),
        "canceled" => Span::styled("−", Style::default().fg(Color::DarkGray)),
        _ => Span::styled("•", Style::default().fg(Color::Yellow)),
    }
}

fn scan_list_line(scan: &ScanRow, is_selected: bool) -> Line<'_> {
    // Safe substring handling for scan id and created_at
    let id_short = if scan.id.len() >= 10 {
        &scan.id[..10]
    } else {
        &scan.id
    };
    let created_short = if scan.created_at.len() >= 16 {
        &scan.created_at[..16]
    } else {
        &scan.created_at
    };

    Line::from(vec![
        Span::raw(if is_selected { "> " } else { "  " }),
        scan_status_icon(&scan.status),
        Span::raw(format!(
            "  {}  {}  {:<9}  {:<5}  {}",
            id_short, created_short, scan.status, scan.mode, scan.target
        )),
    ])
}

fn render_recent_scans(frame: &mut Frame, app: &TuiApp, area: Rect, selected: usize) {
    let block = Block::default()
        .title("Recent Scans")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.data.recent_scans.is_empty() {
        let text = Paragraph::new("  No scans yet - press [n] to start one")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let items: Vec<ListItem> = app
        .data
        .recent_scans
        .iter()
        .enumerate()
        .map(|(i, scan)| {
            let is_selected = i == selected;
            let style = if is_selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(scan_list_line(scan, is_selected)).style(style)
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}

fn render_history(frame: &mut Frame, app: &TuiApp, area: Rect, selected: usize) {
    let block = Block::default()
        .title("Scan History")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.data.all_scans.is_empty() {
        let text = Paragraph::new("  No scans found")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let items: Vec<ListItem> = app
        .data
        .all_scans
        .iter()
        .enumerate()
        .map(|(i, scan)| {
            let is_selected = i == selected;
            let style = if is_selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(scan_list_line(scan, is_selected)).style(style)
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}

fn render_detail(frame: &mut Frame, app: &TuiApp, area: Rect, _scroll: u16) {
    let block = Block::default()
        .title("Scan Details")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let scan = match &app.data.selected_scan {
        Some(s) => s,
        None => {
            let text = Paragraph::new("  Loading...")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(text, area);
            return;
        }
    };

    let label = Style::default().fg(Color::Cyan);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Job ID:    ", label),
            Span::raw(&scan.scan.id),
        ]),
        Line::from(vec![
            Span::styled("  Target:    ", label),
            Span::raw(&scan.scan.target),
        ]),
        Line::from(vec![
            Span::styled("  Mode:      ", label),
            Span::raw(&scan.scan.mode),
        ]),
        Line::from(vec![
            Span::styled("  Status:    ", label),
            scan_status_icon(&scan.scan.status),
            Span::raw(format!(" {}", scan.scan.status)),
        ]),
        Line::from(vec![
            Span::styled("  Progress:  ", label),
            Span::raw(format!("{}%", scan.scan.progress)),
        ]),
        Line::from(vec![
            Span::styled("  Created:   ", label),
            Span::raw(&scan.scan.created_at),
        ]),
    ];

    if let Some(error) = &scan.scan.error {
        lines.push(Line::from(vec![
            Span::styled("  Error:     ", label),
            Span::styled(error.as_str(), Style::default().fg(Color::Red)),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Status History",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from("  ─────────────────────────────────────────"));

    for entry in &scan.history {
        let timestamp = if entry.created_at.len() >= 19 {
            &entry.created_at[11..19]
        } else {
            &entry.created_at
        };

        let mut parts = vec![
            Span::raw(format!("  {}  ", timestamp)),
            Span::styled(
                format!("{:<10}", entry.status),
                Style::default().fg(Color::White),
            ),
        ];

        if let Some(desc) = &entry.description {
            parts.push(Span::raw(format!("  {}", desc)));
        }

        lines.push(Line::from(parts));
    }

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_new_scan(frame: &mut Frame, area: Rect, form: &NewScanForm) {
    let block = Block::default()
        .title("New Scan")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let label = Style::default().fg(Color::Cyan);
    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Target: ", label),
            Span::raw(form.target.as_str()),
            Span::styled("█", Style::default().fg(Color::Gray)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Mode:   ", label),
            Span::styled(
                format!(" {} ", form.mode),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  (Tab to toggle)", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  URL, IP address, or CIDR block",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let help_text = match &app.view {
        View::Dashboard { .. } => {
            "[n] New scan  [c] Cancel  [↑↓] Navigate  [Enter] Details  [h] History  [r] Refresh  [q] Quit"
        }
        View::History { .. } => "[↑↓] Navigate  [Enter] Details  [Esc] Back  [q] Quit",
        View::Detail { .. } => "[Esc] Back  [q] Quit",
        View::NewScan(_) => "[Enter] Submit  [Tab] Mode  [Esc] Cancel",
    };

    let mut spans = vec![Span::raw(format!("  {}", help_text))];

    if let Some(error) = &app.error {
        spans.push(Span::styled(
            format!("  Error: {}", error),
            Style::default().fg(Color::Red),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn format_active_banner(job: &ScanJob) -> Line<'static> {
    let id_short = &job.job_id[..10.min(job.job_id.len())];

    match job.status {
        ScanStatus::Queued => Line::from(vec![
            Span::styled("▶ ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}  {}  Queued...", id_short, job.target)),
        ]),
        ScanStatus::Running => {
            let bar = progress_bar(job.progress, 25);
            let eta = match job.estimated_time_left_seconds {
                Some(secs) => format!("  ~{} left", format_duration(secs)),
                None => String::new(),
            };
            Line::from(vec![
                Span::styled("▶ ", Style::default().fg(Color::Green)),
                Span::raw(format!(
                    "{}  {} {:>3}%  {}{}",
                    id_short, bar, job.progress, job.target, eta
                )),
            ])
        }
        // Terminal states drop out of the banner on the next refresh.
        ScanStatus::Completed => Line::from(vec![
            Span::styled("✓ ", Style::default().fg(Color::Green)),
            Span::raw(format!("{}  Completed", id_short)),
        ]),
        ScanStatus::Failed => Line::from(vec![
            Span::styled("✗ ", Style::default().fg(Color::Red)),
            Span::raw(format!("{}  Failed", id_short)),
        ]),
        ScanStatus::Canceled => Line::from(vec![
            Span::styled("− ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{}  Canceled", id_short)),
        ]),
    }
}

fn progress_bar(percentage: u8, width: usize) -> String {
    let percentage = percentage.min(100) as usize;
    let filled = (percentage * width) / 100;
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
