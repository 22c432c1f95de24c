use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use certprep::history::DomainTotals;
use certprep::session::DomainScore;
use certprep::util::{format_delta, format_duration, format_percent, humanize_since};

use crate::App;

pub struct DomainRowData {
    pub domain: String,
    pub total: usize,
    pub attempted: usize,
    pub correct: usize,
    pub score_percent: f64,
    /// Change against the same domain in the previous attempt
    pub score_delta: Option<f64>,
    pub lifetime: Option<DomainTotals>,
}

/// Joins this session's per-domain tallies with history
pub fn domain_rows(
    current: &[DomainScore],
    previous: Option<&[DomainScore]>,
    lifetime: &[DomainTotals],
) -> Vec<DomainRowData> {
    current
        .iter()
        .map(|d| {
            let score_delta = previous
                .and_then(|prev| prev.iter().find(|p| p.domain == d.domain))
                .map(|p| d.score_percent() - p.score_percent());
            DomainRowData {
                domain: d.domain.clone(),
                total: d.total,
                attempted: d.attempted,
                correct: d.correct,
                score_percent: d.score_percent(),
                score_delta,
                lifetime: lifetime.iter().find(|t| t.domain == d.domain).cloned(),
            }
        })
        .collect()
}

/// Pure presenter for a single domain row
pub fn present_row(data: &DomainRowData) -> Row<'static> {
    let score_color = if data.attempted == 0 {
        Color::Gray
    } else if data.score_percent >= 70.0 {
        Color::Green
    } else if data.score_percent >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    let (delta_display, delta_style) = match data.score_delta {
        Some(delta) if delta > 0.5 => (format_delta(delta), Style::default().fg(Color::Green)),
        Some(delta) if delta < -0.5 => (format_delta(delta), Style::default().fg(Color::Red)),
        Some(delta) => (format_delta(delta), Style::default()),
        None => ("—".to_string(), Style::default().fg(Color::Gray)),
    };

    let lifetime_display = match &data.lifetime {
        Some(t) if t.answered > 0 => format!(
            "{} ({}/{})",
            format_percent(t.accuracy_percent()),
            t.correct,
            t.answered
        ),
        _ => "—".to_string(),
    };

    Row::new(vec![
        Cell::from(data.domain.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{}/{}", data.attempted, data.total)),
        Cell::from(data.correct.to_string()),
        Cell::from(format_percent(data.score_percent)).style(Style::default().fg(score_color)),
        Cell::from(delta_display).style(delta_style),
        Cell::from(lifetime_display),
    ])
}

/// "Recent Attempts (3 total, best 83.3%)"
pub fn recent_title(attempts: i64, best_score: Option<f64>) -> String {
    match best_score {
        Some(best) => format!(
            "Recent Attempts ({attempts} total, best {})",
            format_percent(best)
        ),
        None => "Recent Attempts".to_string(),
    }
}

/// Render the per-domain breakdown and recent attempts
pub fn render_domain_stats(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Domain table
            Constraint::Length(8), // Recent attempts
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let title = Paragraph::new(format!(
        "Domain Breakdown: {}",
        app.session.exam_type().label()
    ))
    .block(Block::default().borders(Borders::ALL).title("Stats"))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let breakdown = app.session.domain_breakdown();
    let rows = domain_rows(
        &breakdown,
        app.previous_attempt.as_ref().map(|a| a.domains.as_slice()),
        &app.domain_totals,
    );

    // Calculate scrolling bounds
    let table_height = chunks[1].height.saturating_sub(3) as usize; // borders + header
    let max_scroll = rows.len().saturating_sub(table_height);
    if app.stats_state.scroll_offset > max_scroll {
        app.stats_state.scroll_offset = max_scroll;
    }

    let header = Row::new(vec![
        Cell::from("Domain"),
        Cell::from("Attempted"),
        Cell::from("Correct"),
        Cell::from("Score"),
        Cell::from("Δ prev"),
        Cell::from("All time"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let visible_rows: Vec<Row> = rows
        .iter()
        .skip(app.stats_state.scroll_offset)
        .take(table_height)
        .map(present_row)
        .collect();

    let widths = [
        Constraint::Min(18),    // Domain
        Constraint::Length(10), // Attempted
        Constraint::Length(8),  // Correct
        Constraint::Length(8),  // Score
        Constraint::Length(8),  // Delta
        Constraint::Length(18), // All time
    ];

    let table = Table::new(visible_rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("This Test"))
        .column_spacing(2);
    f.render_widget(table, chunks[1]);

    if app.recent_attempts.is_empty() {
        let no_data =
            Paragraph::new("No finished attempts yet. Press (f) during a test to finish it.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().borders(Borders::ALL).title("Recent Attempts"));
        f.render_widget(no_data, chunks[2]);
    } else {
        let now = Utc::now();
        let recent: Vec<Row> = app
            .recent_attempts
            .iter()
            .map(|a| {
                Row::new(vec![
                    Cell::from(humanize_since(a.finished_at, now)),
                    Cell::from(format!("{}/{}", a.correct, a.total)),
                    Cell::from(format_percent(a.score_percent)),
                    Cell::from(format_duration(chrono::Duration::seconds(a.elapsed_secs))),
                ])
            })
            .collect();
        let table = Table::new(
            recent,
            [
                Constraint::Min(16),
                Constraint::Length(8),
                Constraint::Length(8),
                Constraint::Length(10),
            ],
        )
        .header(
            Row::new(vec!["Finished", "Correct", "Score", "Time"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(recent_title(app.attempt_count, app.best_score)),
        )
        .column_spacing(2);
        f.render_widget(table, chunks[2]);
    }

    let instructions = Paragraph::new("(↑/↓) scroll  (Home) top  (b/backspace) back  (r) new test  (esc) quit")
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[3]);
}
