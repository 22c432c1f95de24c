use ratatui::Frame;

use crate::{
    ui::{domain_stats::render_domain_stats, question::render_quiz, summary::render_summary},
    App, AppState,
};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Question navigator and panel. Also hosts feedback and the jump prompt.
pub struct QuizScreen;

impl Screen for QuizScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_quiz(app, f);
    }
}

pub struct SummaryScreen;

impl Screen for SummaryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_summary(app, f);
    }
}

pub struct DomainStatsScreen;

impl Screen for DomainStatsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_domain_stats(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Quiz | AppState::Feedback | AppState::Jump => Box::new(QuizScreen),
        AppState::Summary => Box::new(SummaryScreen),
        AppState::DomainStats => Box::new(DomainStatsScreen),
    }
}
