use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use certprep::session::{QuestionStatus, Session};
use certprep::util::format_percent;

use super::truncate;

pub fn status_icon(status: QuestionStatus) -> &'static str {
    match status {
        QuestionStatus::Answered => "✅",
        QuestionStatus::Marked => "🔁",
        QuestionStatus::Unanswered => "⬜",
    }
}

/// Progress metrics above the question list
pub fn progress_lines(session: &Session) -> Vec<Line<'static>> {
    let summary = session.summary();
    vec![
        Line::from(format!("Attempted: {}/{}", summary.attempted, summary.total)),
        Line::from(Span::styled(
            format!("Correct:   {}", summary.correct),
            Style::default().fg(Color::Green),
        )),
        Line::from(Span::styled(
            format!("Incorrect: {}", summary.incorrect),
            Style::default().fg(Color::Red),
        )),
        Line::from(format!("Score:     {}", format_percent(summary.score_percent))),
    ]
}

pub fn render_navigator(session: &Session, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(area);

    let progress = Paragraph::new(progress_lines(session))
        .block(Block::default().borders(Borders::ALL).title("Progress"));
    f.render_widget(progress, chunks[0]);

    // icon + space + "Q" prefix, inside borders
    let text_width = (chunks[1].width as usize).saturating_sub(2 + 6 + 4);
    let items: Vec<ListItem> = session
        .review_items()
        .map(|(i, q, _)| {
            let status = session.status_of(&q.question_id);
            ListItem::new(Line::from(vec![
                Span::raw(format!("{} ", status_icon(status))),
                Span::styled(
                    format!("Q{:<3} ", i + 1),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    truncate(&q.domain, text_width),
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Questions"))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("› ");

    let mut state = ListState::default().with_selected(Some(session.current_index()));
    f.render_stateful_widget(list, chunks[1], &mut state);
}
