use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which certification exam a question (or session) belongs to.
///
/// The same value doubles as a question's difficulty: a session for an exam
/// draws exactly the questions whose difficulty matches it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExamType {
    Associate,
    Professional,
}

pub type Difficulty = ExamType;

impl ExamType {
    pub const ALL: [ExamType; 2] = [ExamType::Associate, ExamType::Professional];

    /// Human readable exam name shown in headers
    pub fn label(&self) -> &'static str {
        match self {
            ExamType::Associate => "Databricks Certified Data Engineer Associate",
            ExamType::Professional => "Databricks Certified Data Engineer Professional",
        }
    }

    /// Bank file name used when loading a directory of banks
    pub fn bank_file_name(&self) -> String {
        format!("{self}.json")
    }

    pub fn other(&self) -> ExamType {
        match self {
            ExamType::Associate => ExamType::Professional,
            ExamType::Professional => ExamType::Associate,
        }
    }

    pub fn parse(s: &str) -> Option<ExamType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "associate" => Some(ExamType::Associate),
            "professional" => Some(ExamType::Professional),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub key: String,
    pub text: String,
}

impl Choice {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}) {}", self.key, self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Explanation {
    /// Why the correct answer is correct
    pub correct: String,
    /// Per-choice notes on why the other options are wrong
    pub options: BTreeMap<String, String>,
}

impl Explanation {
    pub fn new(correct: impl Into<String>) -> Self {
        Self {
            correct: correct.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, note: impl Into<String>) -> Self {
        self.options.insert(key.into(), note.into());
        self
    }

    pub fn for_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// A single multiple-choice question from a bank. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub question_id: String,
    pub domain: String,
    pub difficulty: Difficulty,
    pub question_text: String,
    /// Choices in display order
    pub choices: Vec<Choice>,
    /// Key of the correct choice
    pub correct_answer: String,
    pub explanation: Explanation,
}

impl Question {
    pub fn choice(&self, key: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.key == key)
    }

    pub fn choice_at(&self, idx: usize) -> Option<&Choice> {
        self.choices.get(idx)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.choices.iter().position(|c| c.key == key)
    }

    pub fn correct_choice(&self) -> Option<&Choice> {
        self.choice(&self.correct_answer)
    }

    pub fn is_correct(&self, selected_choice: &str) -> bool {
        selected_choice == self.correct_answer
    }

    /// Checks the structural rules a bank entry must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.question_id.trim().is_empty() {
            return Err("question_id is empty".to_string());
        }
        if self.choices.is_empty() {
            return Err("no choices".to_string());
        }
        if self.choice(&self.correct_answer).is_none() {
            return Err(format!(
                "correct answer {:?} is not one of the choices",
                self.correct_answer
            ));
        }
        Ok(())
    }
}
