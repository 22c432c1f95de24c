mod ui;

use certprep::{
    app_dirs::AppDirs,
    bank::QuestionBank,
    config::{Config, ConfigStore, FileConfigStore},
    error::{BankError, SessionError},
    history::{AttemptRecord, DomainTotals, HistoryDb},
    logging,
    question::ExamType,
    runtime::{CrosstermEventSource, FixedTicker, QuizEvent, QuizEventSource, Runner, Ticker},
    session::{QuestionOrder, Session},
    store::{FileSessionStore, MemorySessionStore, SessionStore},
};
use chrono::Utc;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use tracing::{info, warn};

const TICK_RATE_MS: u64 = 250;
const HISTORY_ROWS: usize = 5;

/// practice multiple-choice certification exams in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Practice Databricks Data Engineer certification questions in the terminal. Progress is saved per user and exam, and finished attempts are kept in a local history."
)]
pub struct Cli {
    /// name or id your sessions are saved under
    #[clap(short = 'u', long)]
    user: Option<String>,

    /// exam to practice
    #[clap(short = 'e', long, value_enum)]
    exam: Option<ExamType>,

    /// directory containing associate.json and/or professional.json
    /// (defaults to the built-in sample banks)
    #[clap(short = 'b', long)]
    bank_dir: Option<PathBuf>,

    /// keep the bank's question order (sorted by id) instead of shuffling
    #[clap(long)]
    no_shuffle: bool,

    /// resume the last saved session for this user and exam
    #[clap(long)]
    resume: bool,

    /// do not write sessions or history to disk
    #[clap(long)]
    no_save: bool,

    /// print the number of questions per exam and exit
    #[clap(long)]
    list: bool,
}

/// Effective settings after merging CLI flags over the saved config
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub user: String,
    pub exam: ExamType,
    pub shuffle: bool,
    pub bank_dir: Option<PathBuf>,
    pub resume: bool,
}

impl Settings {
    pub fn resolve(cli: &Cli, cfg: &Config) -> Self {
        let user = cli
            .user
            .clone()
            .or_else(|| cfg.user.clone())
            .or_else(|| std::env::var("USER").ok())
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "guest".to_string());

        Self {
            user,
            exam: cli.exam.unwrap_or(cfg.exam),
            shuffle: !cli.no_shuffle && cfg.shuffle,
            bank_dir: cli.bank_dir.clone().or_else(|| cfg.bank_dir.clone()),
            resume: cli.resume || cfg.resume,
        }
    }

    pub fn order(&self) -> QuestionOrder {
        if self.shuffle {
            QuestionOrder::Shuffled
        } else {
            QuestionOrder::ById
        }
    }

    /// Config to write back after a run. User, exam and bank dir are
    /// remembered; `--no-shuffle` and `--resume` only apply to this run.
    pub fn remembered(&self, saved: &Config) -> Config {
        Config {
            user: Some(self.user.clone()),
            exam: self.exam,
            shuffle: saved.shuffle,
            bank_dir: self.bank_dir.clone(),
            resume: saved.resume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Quiz,
    Feedback,
    Jump,
    Summary,
    DomainStats,
}

#[derive(Debug, Default)]
pub struct DomainStatsState {
    pub scroll_offset: usize,
}

/// Result of handling one key
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Continue,
    Quit,
}

pub struct App {
    pub settings: Settings,
    pub bank: QuestionBank,
    pub session: Session,
    pub state: AppState,
    /// highlighted choice in the question panel
    pub choice_cursor: usize,
    pub jump_input: String,
    pub stats_state: DomainStatsState,
    /// screen to go back to when leaving the stats screen
    pub stats_return: AppState,
    pub summary_scroll: u16,
    /// one-line message shown in the footer
    pub status: Option<String>,
    pub store: Box<dyn SessionStore>,
    pub history: Option<HistoryDb>,
    /// attempt finished before the current one, for deltas
    pub previous_attempt: Option<AttemptRecord>,
    pub domain_totals: Vec<DomainTotals>,
    pub recent_attempts: Vec<AttemptRecord>,
    /// finished attempts and best score for the current user and exam
    pub attempt_count: i64,
    pub best_score: Option<f64>,
}

impl App {
    pub fn new(
        settings: Settings,
        bank: QuestionBank,
        store: Box<dyn SessionStore>,
        history: Option<HistoryDb>,
    ) -> Result<Self, SessionError> {
        let (session, status) = Self::open_session(&settings, settings.exam, &bank, &*store)?;

        let mut app = Self {
            settings,
            bank,
            session,
            state: AppState::Quiz,
            choice_cursor: 0,
            jump_input: String::new(),
            stats_state: DomainStatsState::default(),
            stats_return: AppState::Quiz,
            summary_scroll: 0,
            status,
            store,
            history,
            previous_attempt: None,
            domain_totals: Vec::new(),
            recent_attempts: Vec::new(),
            attempt_count: 0,
            best_score: None,
        };
        app.after_session_change();
        Ok(app)
    }

    /// Resumes the saved session when asked to and one exists, else starts fresh.
    fn open_session(
        settings: &Settings,
        exam: ExamType,
        bank: &QuestionBank,
        store: &dyn SessionStore,
    ) -> Result<(Session, Option<String>), SessionError> {
        if settings.resume {
            match store.load(&settings.user, exam) {
                Ok(Some(saved)) => match saved.restore(bank.pool()) {
                    Ok(session) => {
                        info!(user = %settings.user, %exam, "resumed saved session");
                        let status = format!("Session restored for: {}", exam.label());
                        return Ok((session, Some(status)));
                    }
                    Err(e) => warn!(error = %e, "saved session could not be restored"),
                },
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to load saved session"),
            }
            let session = Self::fresh_session(settings, exam, bank)?;
            return Ok((
                session,
                Some("No saved session found for this user and exam. Started a new test.".into()),
            ));
        }

        let session = Self::fresh_session(settings, exam, bank)?;
        Ok((session, Some(format!("New test started for: {}", exam.label()))))
    }

    fn fresh_session(
        settings: &Settings,
        exam: ExamType,
        bank: &QuestionBank,
    ) -> Result<Session, SessionError> {
        Session::start_with(
            settings.user.clone(),
            exam,
            bank.pool(),
            settings.order(),
            &mut rand::thread_rng(),
        )
    }

    fn after_session_change(&mut self) {
        self.state = if self.session.is_finished() {
            AppState::Summary
        } else {
            AppState::Quiz
        };
        self.summary_scroll = 0;
        self.stats_state = DomainStatsState::default();
        self.jump_input.clear();
        self.sync_choice_cursor();
        self.refresh_history();
        self.persist();
    }

    fn refresh_history(&mut self) {
        let Some(db) = &self.history else {
            return;
        };
        let user = self.session.user();
        let exam = self.session.exam_type();
        match db.recent_attempts(user, exam, HISTORY_ROWS) {
            Ok(recent) => self.recent_attempts = recent,
            Err(e) => warn!(error = %e, "failed to read attempt history"),
        }
        match db.domain_totals(user, exam) {
            Ok(totals) => self.domain_totals = totals,
            Err(e) => warn!(error = %e, "failed to read domain totals"),
        }
        match db
            .attempt_count(user, exam)
            .and_then(|count| Ok((count, db.best_score(user, exam)?)))
        {
            Ok((count, best)) => {
                self.attempt_count = count;
                self.best_score = best;
            }
            Err(e) => warn!(error = %e, "failed to read best score"),
        }
    }

    /// Saves the session. Failures are logged; the session carries on in memory.
    pub fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.session) {
            warn!(error = %e, "failed to save session");
            self.status = Some("Could not save progress (see log)".into());
        }
    }

    /// Points the choice cursor at the previously selected choice, if any
    fn sync_choice_cursor(&mut self) {
        let question = self.session.current_question();
        self.choice_cursor = self
            .session
            .response_for(&question.question_id)
            .and_then(|r| r.selected_choice.as_deref())
            .and_then(|key| question.index_of(key))
            .unwrap_or(0);
    }

    pub fn goto(&mut self, idx: usize) {
        self.session.goto(idx);
        self.sync_choice_cursor();
        self.state = AppState::Quiz;
    }

    pub fn next(&mut self) {
        self.session.next();
        self.sync_choice_cursor();
        self.state = AppState::Quiz;
    }

    pub fn previous(&mut self) {
        self.session.previous();
        self.sync_choice_cursor();
        self.state = AppState::Quiz;
    }

    pub fn move_cursor(&mut self, down: bool) {
        let n = self.session.current_question().choices.len();
        if n == 0 {
            return;
        }
        self.choice_cursor = if down {
            (self.choice_cursor + 1) % n
        } else {
            (self.choice_cursor + n - 1) % n
        };
    }

    pub fn submit(&mut self) {
        let Some(key) = self
            .session
            .current_question()
            .choice_at(self.choice_cursor)
            .map(|c| c.key.clone())
        else {
            return;
        };
        match self.session.answer_current(&key) {
            Ok(_) => {
                self.state = AppState::Feedback;
                self.persist();
            }
            Err(e) => warn!(error = %e, "answer rejected"),
        }
    }

    pub fn toggle_mark(&mut self) {
        self.session.toggle_mark_current();
        self.persist();
    }

    pub fn finish(&mut self) {
        if self.session.is_finished() {
            self.state = AppState::Summary;
            return;
        }
        let now = Utc::now();
        self.session.finish(now);
        self.previous_attempt = self.recent_attempts.first().cloned();

        if let Some(db) = &mut self.history {
            let record = AttemptRecord::from_session(&self.session, now);
            if let Err(e) = db.record_attempt(&record) {
                warn!(error = %e, "failed to record attempt");
            }
        }
        let summary = self.session.summary_at(now);
        info!(
            user = self.session.user(),
            exam = %self.session.exam_type(),
            correct = summary.correct,
            total = summary.total,
            "test finished"
        );

        self.refresh_history();
        self.persist();
        self.summary_scroll = 0;
        self.state = AppState::Summary;
    }

    /// Starts a new test for `exam`, keeping the current one if the exam has no questions.
    pub fn start_new(&mut self, exam: ExamType) {
        let mut settings = self.settings.clone();
        settings.resume = false;
        self.open(exam, &settings);
    }

    /// Switches to the other exam, resuming its saved session when one exists.
    pub fn switch_exam(&mut self) {
        let exam = self.session.exam_type().other();
        let mut settings = self.settings.clone();
        settings.resume = true;
        self.open(exam, &settings);
    }

    fn open(&mut self, exam: ExamType, settings: &Settings) {
        match Self::open_session(settings, exam, &self.bank, &*self.store) {
            Ok((session, status)) => {
                self.session = session;
                self.settings.exam = exam;
                self.status = status;
                self.previous_attempt = None;
                self.after_session_change();
            }
            Err(e) => {
                warn!(error = %e, %exam, "cannot start session");
                self.status = Some(e.to_string());
            }
        }
    }

    fn confirm_jump(&mut self) {
        let target = self.jump_input.parse::<usize>().unwrap_or(1);
        self.jump_input.clear();
        self.goto(target.saturating_sub(1));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        match self.state {
            AppState::Quiz | AppState::Feedback => match key.code {
                KeyCode::Esc => return Action::Quit,
                KeyCode::Left | KeyCode::Char('p') => self.previous(),
                KeyCode::Right | KeyCode::Char('n') => self.next(),
                KeyCode::Up | KeyCode::Char('k') => {
                    self.move_cursor(false);
                    self.state = AppState::Quiz;
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.move_cursor(true);
                    self.state = AppState::Quiz;
                }
                KeyCode::Char(c @ '1'..='9') => {
                    let idx = c as usize - '1' as usize;
                    if idx < self.session.current_question().choices.len() {
                        self.choice_cursor = idx;
                        self.state = AppState::Quiz;
                    }
                }
                KeyCode::Enter => self.submit(),
                KeyCode::Char('m') => self.toggle_mark(),
                KeyCode::Char('g') => {
                    self.jump_input.clear();
                    self.state = AppState::Jump;
                }
                KeyCode::Char('f') => self.finish(),
                KeyCode::Char('s') => {
                    self.stats_return = AppState::Quiz;
                    self.state = AppState::DomainStats;
                }
                KeyCode::Char('x') => self.switch_exam(),
                KeyCode::Char('r') => self.start_new(self.session.exam_type()),
                _ => {}
            },
            AppState::Jump => match key.code {
                KeyCode::Esc => {
                    self.jump_input.clear();
                    self.state = AppState::Quiz;
                }
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    if self.jump_input.len() < 6 {
                        self.jump_input.push(c);
                    }
                }
                KeyCode::Backspace => {
                    self.jump_input.pop();
                }
                KeyCode::Enter => self.confirm_jump(),
                _ => {}
            },
            AppState::Summary => match key.code {
                KeyCode::Esc => return Action::Quit,
                KeyCode::Up | KeyCode::Char('k') => {
                    self.summary_scroll = self.summary_scroll.saturating_sub(1)
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.summary_scroll = self.summary_scroll.saturating_add(1)
                }
                KeyCode::PageUp => self.summary_scroll = self.summary_scroll.saturating_sub(10),
                KeyCode::PageDown => self.summary_scroll = self.summary_scroll.saturating_add(10),
                KeyCode::Home => self.summary_scroll = 0,
                KeyCode::Char('s') => {
                    self.stats_return = AppState::Summary;
                    self.state = AppState::DomainStats;
                }
                KeyCode::Char('x') => self.switch_exam(),
                KeyCode::Char('r') | KeyCode::Char('n') => {
                    self.start_new(self.session.exam_type())
                }
                _ => {}
            },
            AppState::DomainStats => match key.code {
                KeyCode::Esc => return Action::Quit,
                KeyCode::Char('b') | KeyCode::Backspace => self.state = self.stats_return,
                KeyCode::Up => {
                    self.stats_state.scroll_offset =
                        self.stats_state.scroll_offset.saturating_sub(1)
                }
                KeyCode::Down => self.stats_state.scroll_offset += 1,
                KeyCode::Home => self.stats_state.scroll_offset = 0,
                KeyCode::Char('r') => self.start_new(self.session.exam_type()),
                _ => {}
            },
        }
        Action::Continue
    }
}

fn load_bank(settings: &Settings) -> Result<QuestionBank, BankError> {
    match &settings.bank_dir {
        Some(dir) => QuestionBank::from_dir(dir),
        None => QuestionBank::embedded(),
    }
}

fn print_bank_counts(bank: &QuestionBank) {
    for exam in ExamType::ALL {
        println!("{:<14} {:>4}  {}", exam.to_string(), bank.count_for(exam), exam.label());
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // logging goes up first so config warnings are not lost
    if cli.list {
        logging::init_stderr_logging();
    } else {
        if !stdin().is_tty() {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
        }
        if !cli.no_save {
            if let Err(e) = logging::init_file_logging(&AppDirs::log_path()) {
                eprintln!("logging disabled: {e}");
            }
        }
    }

    let config_store = FileConfigStore::new();
    let saved_config = config_store.load();
    let settings = Settings::resolve(&cli, &saved_config);

    if cli.list {
        print_bank_counts(&load_bank(&settings)?);
        return Ok(());
    }

    let bank = load_bank(&settings)?;
    let (store, history): (Box<dyn SessionStore>, Option<HistoryDb>) = if cli.no_save {
        (Box::new(MemorySessionStore::new()), None)
    } else {
        let history = HistoryDb::open(AppDirs::history_db_path())
            .map_err(|e| warn!(error = %e, "attempt history unavailable"))
            .ok();
        (Box::new(FileSessionStore::new()), history)
    };

    let mut app = match App::new(settings.clone(), bank, store, history) {
        Ok(app) => app,
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };
    if let Err(e) = config_store.save(&settings.remembered(&saved_config)) {
        warn!(error = %e, "failed to save config");
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: QuizEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui::ui(app, f))?;

    loop {
        match runner.step() {
            QuizEvent::Tick => {
                // keep the elapsed clock moving while a test is in progress
                if !app.session.is_finished() {
                    terminal.draw(|f| ui::ui(app, f))?;
                }
            }
            QuizEvent::Resize => {
                terminal.draw(|f| ui::ui(app, f))?;
            }
            QuizEvent::Key(key) => {
                if app.handle_key(key) == Action::Quit {
                    app.persist();
                    break;
                }
                terminal.draw(|f| ui::ui(app, f))?;
            }
        }
    }

    Ok(())
}
