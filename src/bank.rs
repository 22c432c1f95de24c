use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use include_dir::{include_dir, Dir};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::BankError;
use crate::question::{Choice, ExamType, Explanation, Question};

static BANK_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/banks");

#[derive(Deserialize)]
struct RawQuestion {
    question_id: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    difficulty: Option<ExamType>,
    question_text: String,
    choices: RawChoices,
    correct_answer: RawAnswer,
    #[serde(default)]
    explanation: Option<RawExplanation>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChoices {
    Keyed(BTreeMap<String, String>),
    Listed(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Key(String),
    Index(usize),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExplanation {
    Text(String),
    Detailed {
        correct: String,
        #[serde(default)]
        options: BTreeMap<String, String>,
    },
}

/// Positional key for listed choices: A, B, C ... then 27, 28 ...
fn positional_key(idx: usize) -> String {
    if idx < 26 {
        char::from(b'A' + idx as u8).to_string()
    } else {
        (idx + 1).to_string()
    }
}

impl RawQuestion {
    fn into_question(self, default_exam: Option<ExamType>) -> Result<Question, BankError> {
        let invalid = |reason: String| BankError::InvalidQuestion {
            question_id: self.question_id.clone(),
            reason,
        };

        let difficulty = self
            .difficulty
            .or(default_exam)
            .ok_or_else(|| invalid("missing difficulty".to_string()))?;

        let choices: Vec<Choice> = match self.choices {
            RawChoices::Keyed(map) => map.into_iter().map(|(k, v)| Choice::new(k, v)).collect(),
            RawChoices::Listed(list) => list
                .into_iter()
                .enumerate()
                .map(|(i, text)| Choice::new(positional_key(i), text))
                .collect(),
        };

        let correct_answer = match self.correct_answer {
            RawAnswer::Key(key) => key.trim().to_string(),
            RawAnswer::Index(idx) => choices
                .get(idx)
                .map(|c| c.key.clone())
                .ok_or_else(|| invalid(format!("correct answer index {idx} out of range")))?,
        };

        let explanation = match self.explanation {
            None => Explanation::default(),
            Some(RawExplanation::Text(text)) => Explanation::new(text),
            Some(RawExplanation::Detailed { correct, options }) => Explanation { correct, options },
        };

        let question = Question {
            question_id: self.question_id.clone(),
            domain: self.domain.clone().unwrap_or_else(|| "General".to_string()),
            difficulty,
            question_text: self.question_text.clone(),
            choices,
            correct_answer,
            explanation,
        };
        question.validate().map_err(invalid)?;
        Ok(question)
    }
}

/// Read-only collection of questions for one or both exams
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Arc<Question>>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, BankError> {
        let mut bank = Self::default();
        bank.extend(questions)?;
        Ok(bank)
    }

    /// Parses a JSON array of questions. `default_exam` fills in a missing
    /// `difficulty` for banks that are bound to a single exam.
    pub fn from_json_str(text: &str, default_exam: Option<ExamType>) -> Result<Self, BankError> {
        let raw: Vec<RawQuestion> = serde_json::from_str(text)?;
        let questions = raw
            .into_iter()
            .map(|r| r.into_question(default_exam))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    pub fn from_path<P: AsRef<Path>>(
        path: P,
        default_exam: Option<ExamType>,
    ) -> Result<Self, BankError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BankError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| BankError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bank = Self::from_json_str(&text, default_exam)?;
        info!(path = %path.display(), questions = bank.len(), "loaded question bank");
        Ok(bank)
    }

    /// Loads `associate.json` and `professional.json` from `dir`. Either may be
    /// missing, but not both.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, BankError> {
        let dir = dir.as_ref();
        let mut bank = Self::default();
        let mut found = false;

        for exam in ExamType::ALL {
            let path = dir.join(exam.bank_file_name());
            if !path.exists() {
                debug!(path = %path.display(), "no bank file for exam");
                continue;
            }
            found = true;
            let loaded = Self::from_path(&path, Some(exam))?;
            bank.merge(loaded)?;
        }

        if found {
            Ok(bank)
        } else {
            Err(BankError::NotFound(dir.to_path_buf()))
        }
    }

    /// Sample banks compiled into the binary
    pub fn embedded() -> Result<Self, BankError> {
        let mut bank = Self::default();
        for exam in ExamType::ALL {
            if let Some(text) = BANK_DIR
                .get_file(exam.bank_file_name())
                .and_then(|f| f.contents_utf8())
            {
                bank.merge(Self::from_json_str(text, Some(exam))?)?;
            }
        }
        Ok(bank)
    }

    fn extend(&mut self, questions: Vec<Question>) -> Result<(), BankError> {
        let mut seen: HashSet<(ExamType, String)> = self
            .questions
            .iter()
            .map(|q| (q.difficulty, q.question_id.clone()))
            .collect();

        for q in questions {
            if !seen.insert((q.difficulty, q.question_id.clone())) {
                return Err(BankError::DuplicateId(q.question_id));
            }
            self.questions.push(Arc::new(q));
        }
        Ok(())
    }

    fn merge(&mut self, other: QuestionBank) -> Result<(), BankError> {
        let questions = other
            .questions
            .into_iter()
            .map(Arc::unwrap_or_clone)
            .collect();
        self.extend(questions)
    }

    /// The pool handed to a new session
    pub fn pool(&self) -> &[Arc<Question>] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn count_for(&self, exam: ExamType) -> usize {
        self.questions
            .iter()
            .filter(|q| q.difficulty == exam)
            .count()
    }

    pub fn get(&self, exam: ExamType, question_id: &str) -> Option<&Arc<Question>> {
        self.questions
            .iter()
            .find(|q| q.difficulty == exam && q.question_id == question_id)
    }
}
