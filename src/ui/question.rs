use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use certprep::question::Question;
use certprep::session::Response;

use super::{navigator::render_navigator, render_footer, render_header};
use crate::{App, AppState};

const NAVIGATOR_WIDTH: u16 = 30;

/// Choice list with the cursor and the recorded answer
pub fn choice_lines(
    question: &Question,
    cursor: usize,
    response: Option<&Response>,
) -> Vec<Line<'static>> {
    let selected = response.and_then(|r| r.selected_choice.as_deref());
    question
        .choices
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let pointer = if i == cursor { "› " } else { "  " };
            let picked = selected == Some(choice.key.as_str());
            let mut style = Style::default();
            if i == cursor {
                style = style.add_modifier(Modifier::BOLD).fg(Color::Cyan);
            }
            Line::from(vec![
                Span::raw(pointer),
                Span::raw(format!("{}. ", i + 1)),
                Span::styled(choice.to_string(), style),
                Span::styled(
                    if picked { "  ● your answer" } else { "" },
                    Style::default().fg(Color::Magenta),
                ),
            ])
        })
        .collect()
}

/// Verdict, correct answer and explanation for a submitted answer
pub fn feedback_lines(question: &Question, response: &Response) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    if response.is_correct {
        lines.push(Line::from(Span::styled(
            "✅ Correct!",
            bold.fg(Color::Green),
        )));
    } else {
        lines.push(Line::from(Span::styled("❌ Incorrect", bold.fg(Color::Red))));
        let correct = question
            .correct_choice()
            .map(|c| c.to_string())
            .unwrap_or_else(|| question.correct_answer.clone());
        lines.push(Line::from(vec![
            Span::styled("Correct answer: ", bold),
            Span::raw(correct),
        ]));
    }

    if !question.explanation.correct.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled("Explanation: ", bold),
            Span::raw(question.explanation.correct.clone()),
        ]));
    }

    if !question.explanation.options.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Option breakdown:", bold)));
        for (key, note) in &question.explanation.options {
            lines.push(Line::from(format!("  {key}: {note}")));
        }
    }
    lines
}

fn question_lines(app: &App) -> Vec<Line<'static>> {
    let session = &app.session;
    let question = session.current_question();
    let response = session.response_for(&question.question_id);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("Domain: {}", question.domain), dim),
            Span::styled(format!("   Difficulty: {}", question.difficulty), dim),
            Span::styled(format!("   [{}]", question.question_id), dim),
        ]),
        Line::default(),
    ];
    if response.is_some_and(|r| r.is_marked_for_review) {
        lines.push(Line::from(Span::styled(
            "🔁 Marked for review",
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::default());
    }
    lines.extend(
        question
            .question_text
            .lines()
            .map(|l| {
                Line::from(Span::styled(
                    l.to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ))
            }),
    );
    lines.push(Line::default());
    lines.extend(choice_lines(question, app.choice_cursor, response));

    if app.state == AppState::Feedback {
        if let Some(response) = response.filter(|r| r.is_attempted()) {
            lines.push(Line::default());
            lines.extend(feedback_lines(question, response));
        }
    }
    lines
}

pub fn render_question_panel(app: &App, f: &mut Frame, area: Rect) {
    let session = &app.session;
    let title = format!(
        "Question {} of {}",
        session.current_index() + 1,
        session.len()
    );
    let panel = Paragraph::new(question_lines(app))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}

pub fn render_quiz(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // navigator + question
            Constraint::Length(3), // status + keys
        ])
        .split(area);

    render_header(app, f, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(NAVIGATOR_WIDTH), Constraint::Min(0)])
        .split(rows[1]);
    render_navigator(&app.session, f, cols[0]);
    render_question_panel(app, f, cols[1]);

    render_footer(app, f, rows[2]);
}
