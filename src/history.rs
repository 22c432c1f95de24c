use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;
use tracing::debug;

use crate::question::ExamType;
use crate::session::{percent, DomainScore, Session};

/// A finished attempt at an exam
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub user: String,
    pub exam: ExamType,
    pub total: usize,
    pub attempted: usize,
    pub correct: usize,
    pub score_percent: f64,
    pub elapsed_secs: i64,
    pub finished_at: DateTime<Utc>,
    pub domains: Vec<DomainScore>,
}

impl AttemptRecord {
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Self {
        let summary = session.summary_at(now);
        Self {
            user: session.user().to_string(),
            exam: session.exam_type(),
            total: summary.total,
            attempted: summary.attempted,
            correct: summary.correct,
            score_percent: summary.score_percent,
            elapsed_secs: summary.elapsed.num_seconds(),
            finished_at: session.finished_at().unwrap_or(now),
            domains: session.domain_breakdown(),
        }
    }
}

/// Lifetime totals for one domain across all recorded attempts
#[derive(Debug, Clone, PartialEq)]
pub struct DomainTotals {
    pub domain: String,
    pub attempts: i64,
    pub answered: i64,
    pub correct: i64,
}

impl DomainTotals {
    pub fn accuracy_percent(&self) -> f64 {
        percent(self.correct as usize, self.answered as usize)
    }
}

/// Signed change in score between two attempts, in percentage points
pub fn score_delta(previous: &AttemptRecord, current: &AttemptRecord) -> f64 {
    current.score_percent - previous.score_percent
}

/// History of finished attempts, one SQLite database shared by all users
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                exam TEXT NOT NULL,
                total INTEGER NOT NULL,
                attempted INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                score_percent REAL NOT NULL,
                elapsed_secs INTEGER NOT NULL,
                finished_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS attempt_domains (
                attempt_id INTEGER NOT NULL REFERENCES attempts(id) ON DELETE CASCADE,
                domain TEXT NOT NULL,
                total INTEGER NOT NULL,
                attempted INTEGER NOT NULL,
                correct INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_attempts_user_exam ON attempts(user, exam, finished_at);
            CREATE INDEX IF NOT EXISTS idx_attempt_domains_attempt ON attempt_domains(attempt_id);
            "#,
        )?;
        Ok(HistoryDb { conn })
    }

    /// Record an attempt and its per-domain rows in one transaction
    pub fn record_attempt(&mut self, record: &AttemptRecord) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO attempts
            (user, exam, total, attempted, correct, score_percent, elapsed_secs, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.user,
                record.exam.to_string(),
                record.total as i64,
                record.attempted as i64,
                record.correct as i64,
                record.score_percent,
                record.elapsed_secs,
                record.finished_at.to_rfc3339(),
            ],
        )?;
        let attempt_id = tx.last_insert_rowid();

        for d in &record.domains {
            tx.execute(
                r#"
                INSERT INTO attempt_domains (attempt_id, domain, total, attempted, correct)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    attempt_id,
                    d.domain,
                    d.total as i64,
                    d.attempted as i64,
                    d.correct as i64
                ],
            )?;
        }
        tx.commit()?;

        debug!(attempt_id, user = %record.user, exam = %record.exam, "attempt recorded");
        Ok(attempt_id)
    }

    /// Most recent attempts first
    pub fn recent_attempts(
        &self,
        user: &str,
        exam: ExamType,
        limit: usize,
    ) -> Result<Vec<AttemptRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user, exam, total, attempted, correct, score_percent, elapsed_secs, finished_at
            FROM attempts
            WHERE user = ?1 AND exam = ?2
            ORDER BY finished_at DESC, id DESC
            LIMIT ?3
            "#,
        )?;

        let rows = stmt.query_map(params![user, exam.to_string(), limit as i64], |row| {
            let finished_str: String = row.get(8)?;
            let finished_at = DateTime::parse_from_rfc3339(&finished_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        8,
                        "finished_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Utc);
            let exam_str: String = row.get(2)?;

            Ok((
                row.get::<_, i64>(0)?,
                AttemptRecord {
                    user: row.get(1)?,
                    exam: ExamType::parse(&exam_str).unwrap_or(exam),
                    total: row.get::<_, i64>(3)? as usize,
                    attempted: row.get::<_, i64>(4)? as usize,
                    correct: row.get::<_, i64>(5)? as usize,
                    score_percent: row.get(6)?,
                    elapsed_secs: row.get(7)?,
                    finished_at,
                    domains: Vec::new(),
                },
            ))
        })?;

        let mut attempts = Vec::new();
        for row in rows {
            let (id, mut record) = row?;
            record.domains = self.attempt_domains(id)?;
            attempts.push(record);
        }
        Ok(attempts)
    }

    fn attempt_domains(&self, attempt_id: i64) -> Result<Vec<DomainScore>> {
        let mut stmt = self.conn.prepare(
            "SELECT domain, total, attempted, correct FROM attempt_domains \
             WHERE attempt_id = ?1 ORDER BY domain",
        )?;
        let rows = stmt.query_map([attempt_id], |row| {
            Ok(DomainScore {
                domain: row.get(0)?,
                total: row.get::<_, i64>(1)? as usize,
                attempted: row.get::<_, i64>(2)? as usize,
                correct: row.get::<_, i64>(3)? as usize,
            })
        })?;
        rows.collect()
    }

    pub fn last_attempt(&self, user: &str, exam: ExamType) -> Result<Option<AttemptRecord>> {
        Ok(self.recent_attempts(user, exam, 1)?.into_iter().next())
    }

    pub fn best_score(&self, user: &str, exam: ExamType) -> Result<Option<f64>> {
        self.conn
            .query_row(
                "SELECT MAX(score_percent) FROM attempts WHERE user = ?1 AND exam = ?2",
                params![user, exam.to_string()],
                |row| row.get::<_, Option<f64>>(0),
            )
            .optional()
            .map(Option::flatten)
    }

    /// Per-domain totals over every attempt, sorted by domain
    pub fn domain_totals(&self, user: &str, exam: ExamType) -> Result<Vec<DomainTotals>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT d.domain, COUNT(DISTINCT a.id), SUM(d.attempted), SUM(d.correct)
            FROM attempt_domains d
            JOIN attempts a ON a.id = d.attempt_id
            WHERE a.user = ?1 AND a.exam = ?2
            GROUP BY d.domain
            ORDER BY d.domain
            "#,
        )?;
        let rows = stmt.query_map(params![user, exam.to_string()], |row| {
            Ok(DomainTotals {
                domain: row.get(0)?,
                attempts: row.get(1)?,
                answered: row.get(2)?,
                correct: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    pub fn attempt_count(&self, user: &str, exam: ExamType) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM attempts WHERE user = ?1 AND exam = ?2",
            params![user, exam.to_string()],
            |row| row.get(0),
        )
    }
}
