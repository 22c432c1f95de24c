use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app_dirs::AppDirs;
use crate::error::{SessionError, StoreError};
use crate::question::{ExamType, Question};
use crate::session::{Response, Session};

/// Serializable snapshot of a session. Questions are stored by id and
/// resolved against the bank on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub user: String,
    pub exam_type: ExamType,
    pub question_order: Vec<String>,
    #[serde(default)]
    pub responses: HashMap<String, Response>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&Session> for SavedSession {
    fn from(session: &Session) -> Self {
        Self {
            user: session.user().to_string(),
            exam_type: session.exam_type(),
            question_order: session
                .questions()
                .iter()
                .map(|q| q.question_id.clone())
                .collect(),
            responses: session
                .responses()
                .map(|(id, r)| (id.to_string(), r.clone()))
                .collect(),
            started_at: session.started_at(),
            finished_at: session.finished_at(),
        }
    }
}

impl SavedSession {
    /// Rebuilds a session against `pool`. Ids no longer present in the pool
    /// (or now filed under another exam) are dropped.
    pub fn restore(self, pool: &[Arc<Question>]) -> Result<Session, SessionError> {
        let by_id: HashMap<&str, &Arc<Question>> = pool
            .iter()
            .filter(|q| q.difficulty == self.exam_type)
            .map(|q| (q.question_id.as_str(), q))
            .collect();

        let questions: Vec<Arc<Question>> = self
            .question_order
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|q| Arc::clone(q)))
            .collect();

        let dropped = self.question_order.len() - questions.len();
        if dropped > 0 {
            warn!(
                dropped,
                exam = %self.exam_type,
                "saved session references questions missing from the bank"
            );
        }

        Session::from_parts(
            self.user,
            self.exam_type,
            questions,
            self.responses,
            self.started_at,
            self.finished_at,
        )
    }
}

/// Keyed storage of sessions by (user, exam)
pub trait SessionStore {
    fn load(&self, user: &str, exam: ExamType) -> Result<Option<SavedSession>, StoreError>;
    fn save(&self, session: &Session) -> Result<(), StoreError>;
}

type StateFile = BTreeMap<String, BTreeMap<String, SavedSession>>;

/// All users' sessions in a single JSON file:
/// `{ "<user>": { "associate": {...}, "professional": {...} } }`
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::sessions_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_state(&self) -> StateFile {
        let Ok(bytes) = fs::read(&self.path) else {
            return StateFile::new();
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                StateFile::new()
            }
        }
    }
}

impl Default for FileSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, user: &str, exam: ExamType) -> Result<Option<SavedSession>, StoreError> {
        let mut state = self.read_state();
        Ok(state
            .get_mut(user)
            .and_then(|block| block.remove(&exam.to_string())))
    }

    fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut state = self.read_state();
        state
            .entry(session.user().to_string())
            .or_default()
            .insert(session.exam_type().to_string(), SavedSession::from(session));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&state)?;
        fs::write(&self.path, data)?;
        debug!(path = %self.path.display(), user = session.user(), "session saved");
        Ok(())
    }
}

/// In-memory store, used by tests and `--no-save` runs
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RefCell<HashMap<(String, ExamType), SavedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, user: &str, exam: ExamType) -> Result<Option<SavedSession>, StoreError> {
        Ok(self
            .sessions
            .borrow()
            .get(&(user.to_string(), exam))
            .cloned())
    }

    fn save(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.borrow_mut().insert(
            (session.user().to_string(), session.exam_type()),
            SavedSession::from(session),
        );
        Ok(())
    }
}
