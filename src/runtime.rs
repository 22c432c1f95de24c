use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use tracing::debug;

/// What the quiz loop reacts to
#[derive(Clone, Debug, PartialEq)]
pub enum QuizEvent {
    Key(KeyEvent),
    Resize,
    /// Nothing arrived within the tick interval
    Tick,
}

impl QuizEvent {
    /// Maps a terminal event onto a quiz event. Key releases (reported by
    /// some terminals), mouse, focus and paste events are dropped.
    pub fn from_terminal(ev: CtEvent) -> Option<QuizEvent> {
        match ev {
            CtEvent::Key(key) if key.kind != KeyEventKind::Release => Some(QuizEvent::Key(key)),
            CtEvent::Resize(_, _) => Some(QuizEvent::Resize),
            _ => None,
        }
    }
}

pub trait QuizEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError>;
}

/// Reads the terminal on a background thread and forwards quiz events
pub struct CrosstermEventSource {
    rx: Receiver<QuizEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(ev) => ev,
                Err(e) => {
                    debug!(error = %e, "terminal reader stopped");
                    break;
                }
            };
            if let Some(quiz_event) = QuizEvent::from_terminal(ev) {
                // receiver gone means the app has quit
                if tx.send(quiz_event).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Scripted events for tests and headless runs
pub struct TestEventSource {
    rx: Receiver<QuizEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<QuizEvent>) -> Self {
        Self { rx }
    }

    /// A source plus the sender that feeds it
    pub fn channel() -> (Sender<QuizEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }
}

impl QuizEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the quiz one event at a time
pub struct Runner<E: QuizEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: QuizEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Next event, or `Tick` once the interval passes. A closed source
    /// keeps producing ticks.
    pub fn step(&self) -> QuizEvent {
        self.event_source
            .recv_timeout(self.ticker.interval())
            .unwrap_or(QuizEvent::Tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers, MouseEvent, MouseEventKind};

    fn runner(es: TestEventSource) -> Runner<TestEventSource, FixedTicker> {
        Runner::new(es, FixedTicker::new(Duration::from_millis(1)))
    }

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, es) = TestEventSource::channel();
        assert_eq!(runner(es).step(), QuizEvent::Tick);
    }

    #[test]
    fn step_returns_tick_when_disconnected() {
        let (tx, es) = TestEventSource::channel();
        drop(tx);
        let runner = runner(es);
        assert_eq!(runner.step(), QuizEvent::Tick);
        assert_eq!(runner.step(), QuizEvent::Tick);
    }

    #[test]
    fn step_passes_through_events_in_order() {
        let (tx, es) = TestEventSource::channel();
        let n = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE);
        tx.send(QuizEvent::Key(n)).unwrap();
        tx.send(QuizEvent::Resize).unwrap();

        let runner = runner(es);
        assert_eq!(runner.step(), QuizEvent::Key(n));
        assert_eq!(runner.step(), QuizEvent::Resize);
        assert_eq!(runner.step(), QuizEvent::Tick);
    }

    #[test]
    fn terminal_key_press_becomes_key() {
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            QuizEvent::from_terminal(CtEvent::Key(enter)),
            Some(QuizEvent::Key(enter))
        );
        assert_eq!(
            QuizEvent::from_terminal(CtEvent::Resize(80, 24)),
            Some(QuizEvent::Resize)
        );
    }

    #[test]
    fn terminal_key_release_is_dropped() {
        let release = KeyEvent {
            code: KeyCode::Char('m'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(QuizEvent::from_terminal(CtEvent::Key(release)), None);
    }

    #[test]
    fn terminal_mouse_and_focus_are_dropped() {
        let mouse = MouseEvent {
            kind: MouseEventKind::Moved,
            column: 1,
            row: 1,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(QuizEvent::from_terminal(CtEvent::Mouse(mouse)), None);
        assert_eq!(QuizEvent::from_terminal(CtEvent::FocusGained), None);
    }
}
