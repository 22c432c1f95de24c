//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::question::ExamType;

/// Errors raised by the session tracker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for the {exam} exam")]
    EmptyPool { exam: ExamType },
    #[error("question {question_id} is not part of this session")]
    UnknownQuestion { question_id: String },
}

/// Errors raised while loading a question bank.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read question bank {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse question bank: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question {question_id} is invalid: {reason}")]
    InvalidQuestion { question_id: String, reason: String },
    #[error("question id {0} appears more than once")]
    DuplicateId(String),
}

/// Errors raised by the session store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
