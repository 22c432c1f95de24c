pub mod domain_stats;
pub mod navigator;
pub mod question;
pub mod screen;
pub mod summary;

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use certprep::util::format_duration;

use crate::{App, AppState};

pub fn ui(app: &mut App, f: &mut Frame) {
    screen::current_screen(&app.state).render(app, f);
}

/// Cuts `text` to at most `max` display columns, ending with `…` when shortened
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Exam name, user and running clock
fn render_header(app: &App, f: &mut Frame, area: Rect) {
    let session = &app.session;
    let elapsed = format_duration(session.elapsed_at(Utc::now()));
    let line = Line::from(vec![
        Span::styled(
            session.exam_type().label(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   user: "),
        Span::styled(session.user(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("   ⏱ "),
        Span::raw(elapsed),
    ]);
    let header = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).title("certprep"))
        .alignment(Alignment::Center);
    f.render_widget(header, area);
}

/// Status message on the first line, key help or jump prompt on the second
fn render_footer(app: &App, f: &mut Frame, area: Rect) {
    let status = app.status.clone().unwrap_or_default();
    let help = match app.state {
        AppState::Jump => Line::from(vec![
            Span::styled(
                "Jump to question #: ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{}_", app.jump_input)),
            Span::styled(
                format!("  (1-{}, enter to go, esc to cancel)", app.session.len()),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]),
        _ => Line::from(Span::styled(
            "(←/→) prev/next  (↑/↓ or 1-9) choose  (enter) submit  (m) mark  (g) jump  (f) finish  (s) stats  (x) switch exam  (r) restart  (esc) quit",
            Style::default().add_modifier(Modifier::DIM),
        )),
    };
    let footer = Paragraph::new(vec![
        Line::from(Span::styled(status, Style::default().fg(Color::Yellow))),
        help,
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate("Delta Lake", 20), "Delta Lake");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn test_truncate_long_text() {
        assert_eq!(truncate("Structured Streaming", 10), "Structure…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // each CJK char is two columns wide
        let cut = truncate("データエンジニア", 7);
        assert_eq!(cut, "データ…");
        assert!(cut.width() <= 7);
    }
}
