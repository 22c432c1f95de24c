use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use certprep::history::{score_delta, AttemptRecord};
use certprep::session::Session;
use certprep::util::{format_delta, format_duration, format_percent, humanize_since};

use crate::App;

/// Headline numbers for a finished (or abandoned) test
pub fn report_lines(
    session: &Session,
    previous: Option<&AttemptRecord>,
) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let now = Utc::now();
    let summary = session.summary_at(now);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("User:       ", bold),
            Span::raw(session.user().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Exam:       ", bold),
            Span::raw(session.exam_type().label()),
        ]),
        Line::from(vec![
            Span::styled("Attempted:  ", bold),
            Span::raw(format!("{} of {}", summary.attempted, summary.total)),
        ]),
        Line::from(vec![
            Span::styled("Correct:    ", bold),
            Span::styled(summary.correct.to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("Incorrect:  ", bold),
            Span::styled(summary.incorrect.to_string(), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("Score:      ", bold),
            Span::raw(format_percent(summary.score_percent)),
            Span::styled(
                format!(
                    "   (accuracy on attempted {})",
                    format_percent(summary.accuracy_percent)
                ),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]),
        Line::from(vec![
            Span::styled("Time:       ", bold),
            Span::raw(format_duration(summary.elapsed)),
        ]),
    ];

    if let Some(prev) = previous {
        let current = AttemptRecord::from_session(session, now);
        let delta = score_delta(prev, &current);
        let color = if delta > 0.0 {
            Color::Green
        } else if delta < 0.0 {
            Color::Red
        } else {
            Color::Gray
        };
        lines.push(Line::from(vec![
            Span::styled("Previous:   ", bold),
            Span::raw(format!(
                "{} {} ",
                format_percent(prev.score_percent),
                humanize_since(prev.finished_at, now)
            )),
            Span::styled(format!("({})", format_delta(delta)), Style::default().fg(color)),
        ]));
    }
    lines
}

/// Per-question review: verdict, the user's answer, the correct one and why
pub fn review_lines(session: &Session) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    for (i, question, response) in session.review_items() {
        let answered = response.filter(|r| r.is_attempted());
        let verdict = match answered {
            Some(r) if r.is_correct => {
                Span::styled("✅ Correct", Style::default().fg(Color::Green))
            }
            Some(_) => Span::styled("❌ Incorrect", Style::default().fg(Color::Red)),
            None => Span::styled("⬜ Not answered", Style::default().fg(Color::Gray)),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("Q{} ", i + 1), bold),
            Span::styled(
                format!("[{}] ", question.domain),
                Style::default().add_modifier(Modifier::DIM),
            ),
            verdict,
        ]));
        lines.push(Line::from(question.question_text.clone()));

        let picked = answered.and_then(|r| r.selected_choice.as_deref());
        for choice in &question.choices {
            let is_picked = picked == Some(choice.key.as_str());
            let marker = if is_picked { "👉 " } else { "   " };
            let style = if choice.key == question.correct_answer {
                Style::default().fg(Color::Green)
            } else if is_picked {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(format!("{marker}{choice}"), style)));
        }

        match picked {
            Some(key) => {
                let picked = question
                    .choice(key)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| key.to_string());
                lines.push(Line::from(vec![
                    Span::styled("Your answer: ", bold),
                    Span::raw(picked),
                ]));
            }
            None => lines.push(Line::from(Span::styled(
                "You did not answer this question",
                Style::default().fg(Color::Yellow),
            ))),
        }

        let correct = question
            .correct_choice()
            .map(|c| c.to_string())
            .unwrap_or_else(|| question.correct_answer.clone());
        lines.push(Line::from(vec![
            Span::styled("Correct answer: ", bold),
            Span::raw(correct),
        ]));
        if !question.explanation.correct.is_empty() {
            lines.push(Line::from(vec![
                Span::styled("Explanation: ", bold),
                Span::raw(question.explanation.correct.clone()),
            ]));
        }
        if !question.explanation.options.is_empty() {
            lines.push(Line::from(Span::styled("Option breakdown:", bold)));
            for (key, note) in &question.explanation.options {
                lines.push(Line::from(Span::styled(
                    format!("  {key}: {note}"),
                    Style::default().add_modifier(Modifier::ITALIC),
                )));
            }
        }
        lines.push(Line::default());
    }
    lines
}

pub fn render_summary(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(0),    // report
            Constraint::Length(3), // instructions
        ])
        .split(area);

    let title = Paragraph::new("Final Summary")
        .block(Block::default().borders(Borders::ALL).title("Results"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let mut lines = report_lines(&app.session, app.previous_attempt.as_ref());
    lines.push(Line::default());
    lines.extend(review_lines(&app.session));

    // clamp on wrapped rows so the last line can reach the bottom of the panel
    let inner_width = chunks[1].width.saturating_sub(2);
    let inner_height = chunks[1].height.saturating_sub(2) as usize;
    let report = Paragraph::new(lines).wrap(Wrap { trim: false });
    let rows = report.line_count(inner_width);
    let max_scroll = rows.saturating_sub(inner_height).min(u16::MAX as usize) as u16;
    if app.summary_scroll > max_scroll {
        app.summary_scroll = max_scroll;
    }

    let report = report
        .block(Block::default().borders(Borders::ALL))
        .scroll((app.summary_scroll, 0));
    f.render_widget(report, chunks[1]);

    let mut footer = vec![Line::from(Span::styled(
        "(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (s) domain stats  (n/r) new test  (x) switch exam  (esc) quit",
        Style::default().add_modifier(Modifier::DIM),
    ))];
    if let Some(status) = &app.status {
        footer.insert(
            0,
            Line::from(Span::styled(status.clone(), Style::default().fg(Color::Yellow))),
        );
    }
    let instructions = Paragraph::new(footer)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}
