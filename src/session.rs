use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::question::{ExamType, Question};

/// How the filtered pool is ordered when a session starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionOrder {
    #[default]
    Shuffled,
    ById,
    AsGiven,
}

/// Per-question state recorded by the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub selected_choice: Option<String>,
    pub is_correct: bool,
    pub is_marked_for_review: bool,
}

impl Response {
    pub fn is_attempted(&self) -> bool {
        self.selected_choice.is_some()
    }
}

/// Navigator icon state. Marked wins over answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Unanswered,
    Answered,
    Marked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// correct / total questions
    pub score_percent: f64,
    /// correct / attempted
    pub accuracy_percent: f64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainScore {
    pub domain: String,
    pub total: usize,
    pub attempted: usize,
    pub correct: usize,
}

impl DomainScore {
    pub fn incorrect(&self) -> usize {
        self.attempted - self.correct
    }

    pub fn score_percent(&self) -> f64 {
        percent(self.correct, self.total)
    }
}

pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Navigation and answer state for one user attempting one exam.
///
/// The question order is fixed at construction and the question list is never
/// empty, so `current_index` always points at a real question.
#[derive(Debug, Clone)]
pub struct Session {
    user: String,
    exam_type: ExamType,
    questions: Vec<Arc<Question>>,
    positions: HashMap<String, usize>,
    current_index: usize,
    responses: HashMap<String, Response>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Starts a session over the pool's questions for `exam_type`, keeping pool order.
    pub fn start(
        user: impl Into<String>,
        exam_type: ExamType,
        pool: &[Arc<Question>],
    ) -> Result<Self, SessionError> {
        Self::start_with(
            user,
            exam_type,
            pool,
            QuestionOrder::AsGiven,
            &mut rand::thread_rng(),
        )
    }

    pub fn start_with<R: Rng + ?Sized>(
        user: impl Into<String>,
        exam_type: ExamType,
        pool: &[Arc<Question>],
        order: QuestionOrder,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let mut questions: Vec<Arc<Question>> = pool
            .iter()
            .filter(|q| q.difficulty == exam_type)
            .cloned()
            .collect();

        match order {
            QuestionOrder::Shuffled => questions.shuffle(rng),
            QuestionOrder::ById => questions.sort_by(|a, b| a.question_id.cmp(&b.question_id)),
            QuestionOrder::AsGiven => {}
        }

        let session = Self::from_parts(
            user.into(),
            exam_type,
            questions,
            HashMap::new(),
            Utc::now(),
            None,
        )?;
        debug!(
            user = %session.user,
            exam = %exam_type,
            questions = session.len(),
            "session started"
        );
        Ok(session)
    }

    /// Assembles a session from stored parts. Responses for ids outside
    /// `questions` are dropped and correctness is re-graded against the
    /// current answer key.
    pub(crate) fn from_parts(
        user: String,
        exam_type: ExamType,
        questions: Vec<Arc<Question>>,
        mut responses: HashMap<String, Response>,
        started_at: DateTime<Utc>,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyPool { exam: exam_type });
        }

        let positions: HashMap<String, usize> = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.question_id.clone(), i))
            .collect();
        responses.retain(|id, _| positions.contains_key(id));
        for (id, response) in responses.iter_mut() {
            let question = &questions[positions[id]];
            response.is_correct = response
                .selected_choice
                .as_deref()
                .is_some_and(|choice| question.is_correct(choice));
        }

        Ok(Self {
            user,
            exam_type,
            questions,
            positions,
            current_index: 0,
            responses,
            started_at,
            finished_at,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn exam_type(&self) -> ExamType {
        self.exam_type
    }

    pub fn questions(&self) -> &[Arc<Question>] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 == self.len()
    }

    /// Moves to `target_index`, clamped into range.
    pub fn goto(&mut self, target_index: usize) {
        self.current_index = target_index.min(self.len() - 1);
    }

    pub fn next(&mut self) {
        self.goto(self.current_index.saturating_add(1));
    }

    pub fn previous(&mut self) {
        self.goto(self.current_index.saturating_sub(1));
    }

    /// Records `selected_choice` for `question_id`, overwriting any earlier answer
    /// and keeping the review mark.
    pub fn submit_answer(
        &mut self,
        question_id: &str,
        selected_choice: &str,
    ) -> Result<&Response, SessionError> {
        let Some(&pos) = self.positions.get(question_id) else {
            return Err(SessionError::UnknownQuestion {
                question_id: question_id.to_string(),
            });
        };
        let is_correct = self.questions[pos].is_correct(selected_choice);

        let entry = self.responses.entry(question_id.to_string()).or_default();
        entry.selected_choice = Some(selected_choice.to_string());
        entry.is_correct = is_correct;
        debug!(question_id, selected_choice, is_correct, "answer submitted");

        Ok(entry)
    }

    pub fn answer_current(&mut self, selected_choice: &str) -> Result<&Response, SessionError> {
        let question_id = self.current_question().question_id.clone();
        self.submit_answer(&question_id, selected_choice)
    }

    /// Flips the review mark and returns the new value. Ids outside the
    /// session are ignored.
    pub fn toggle_mark(&mut self, question_id: &str) -> bool {
        if !self.positions.contains_key(question_id) {
            warn!(question_id, "ignoring mark toggle for unknown question");
            return false;
        }
        let entry = self.responses.entry(question_id.to_string()).or_default();
        entry.is_marked_for_review = !entry.is_marked_for_review;
        entry.is_marked_for_review
    }

    pub fn toggle_mark_current(&mut self) -> bool {
        let question_id = self.current_question().question_id.clone();
        self.toggle_mark(&question_id)
    }

    /// Freezes elapsed time. Calling it again keeps the first finish time.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        if self.finished_at.is_none() {
            self.finished_at = Some(now.max(self.started_at));
        }
    }

    pub fn response_for(&self, question_id: &str) -> Option<&Response> {
        self.responses.get(question_id)
    }

    /// Every recorded entry, including mark-only ones.
    pub fn responses(&self) -> impl Iterator<Item = (&str, &Response)> {
        self.responses.iter().map(|(id, r)| (id.as_str(), r))
    }

    /// Entries with a selected choice.
    pub fn answers(&self) -> impl Iterator<Item = (&str, &Response)> {
        self.responses().filter(|(_, r)| r.is_attempted())
    }

    pub fn status_of(&self, question_id: &str) -> QuestionStatus {
        match self.responses.get(question_id) {
            Some(r) if r.is_marked_for_review => QuestionStatus::Marked,
            Some(r) if r.is_attempted() => QuestionStatus::Answered,
            _ => QuestionStatus::Unanswered,
        }
    }

    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        let end = self.finished_at.unwrap_or(now);
        (end - self.started_at).max(Duration::zero())
    }

    pub fn summary(&self) -> Summary {
        self.summary_at(Utc::now())
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> Summary {
        let (attempted, correct) = self
            .answers()
            .fold((0, 0), |(attempted, correct), (_, r)| {
                (attempted + 1, correct + usize::from(r.is_correct))
            });

        Summary {
            total: self.len(),
            attempted,
            correct,
            incorrect: attempted - correct,
            score_percent: percent(correct, self.len()),
            accuracy_percent: percent(correct, attempted),
            elapsed: self.elapsed_at(now),
        }
    }

    /// Per-domain tallies, sorted by domain name
    pub fn domain_breakdown(&self) -> Vec<DomainScore> {
        self.questions
            .iter()
            .into_group_map_by(|q| q.domain.clone())
            .into_iter()
            .map(|(domain, questions)| {
                let answered = questions
                    .iter()
                    .filter_map(|q| self.responses.get(&q.question_id))
                    .filter(|r| r.is_attempted());
                let (attempted, correct) = answered.fold((0, 0), |(a, c), r| {
                    (a + 1, c + usize::from(r.is_correct))
                });
                DomainScore {
                    domain,
                    total: questions.len(),
                    attempted,
                    correct,
                }
            })
            .sorted_by(|a, b| a.domain.cmp(&b.domain))
            .collect()
    }

    /// Questions in session order with whatever was recorded for them
    pub fn review_items(&self) -> impl Iterator<Item = (usize, &Question, Option<&Response>)> {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, q)| (i, q.as_ref(), self.responses.get(&q.question_id)))
    }
}

/// Starts a session for an anonymous user, keeping pool order.
pub fn start_session(
    exam_type: ExamType,
    question_pool: &[Arc<Question>],
) -> Result<Session, SessionError> {
    Session::start("", exam_type, question_pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::fixtures::{mixed_pool, question};
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn associate_session() -> Session {
        Session::start("barath.r", ExamType::Associate, &mixed_pool()).unwrap()
    }

    #[test]
    fn test_start_filters_by_difficulty() {
        let session = start_session(ExamType::Associate, &mixed_pool()).unwrap();
        assert_eq!(session.len(), 3);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answers().count(), 0);
        assert!(session
            .questions()
            .iter()
            .all(|q| q.difficulty == ExamType::Associate));
    }

    #[test]
    fn test_start_keeps_pool_order() {
        let session = associate_session();
        let ids: Vec<&str> = session
            .questions()
            .iter()
            .map(|q| q.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn test_start_empty_pool_fails() {
        let err = start_session(ExamType::Professional, &[]).unwrap_err();
        assert_eq!(
            err,
            SessionError::EmptyPool {
                exam: ExamType::Professional
            }
        );
    }

    #[test]
    fn test_start_without_matching_difficulty_fails() {
        let pool = vec![Arc::new(question("q1", ExamType::Associate, "A"))];
        assert_matches!(
            start_session(ExamType::Professional, &pool),
            Err(SessionError::EmptyPool { .. })
        );
    }

    #[test]
    fn test_start_by_id_sorts() {
        let pool = vec![
            Arc::new(question("c", ExamType::Associate, "A")),
            Arc::new(question("a", ExamType::Associate, "A")),
            Arc::new(question("b", ExamType::Associate, "A")),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let session =
            Session::start_with("u", ExamType::Associate, &pool, QuestionOrder::ById, &mut rng)
                .unwrap();
        let ids: Vec<&str> = session
            .questions()
            .iter()
            .map(|q| q.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_start_shuffled_keeps_same_questions() {
        let pool: Vec<_> = (0..20)
            .map(|i| Arc::new(question(&format!("q{i:02}"), ExamType::Associate, "A")))
            .collect();
        let mut rng = StdRng::seed_from_u64(42);
        let session = Session::start_with(
            "u",
            ExamType::Associate,
            &pool,
            QuestionOrder::Shuffled,
            &mut rng,
        )
        .unwrap();
        let mut ids: Vec<String> = session
            .questions()
            .iter()
            .map(|q| q.question_id.clone())
            .collect();
        assert_eq!(ids.len(), 20);
        ids.sort();
        let expected: Vec<String> = (0..20).map(|i| format!("q{i:02}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_goto_clamps() {
        let mut session = associate_session();
        session.goto(1);
        assert_eq!(session.current_index(), 1);
        session.goto(99);
        assert_eq!(session.current_index(), 2);
        session.goto(usize::MAX);
        assert_eq!(session.current_index(), 2);
        session.goto(0);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut session = associate_session();
        for _ in 0..10 {
            session.previous();
            assert!(session.current_index() < session.len());
        }
        assert!(session.is_first());
        for _ in 0..10 {
            session.next();
            assert!(session.current_index() < session.len());
        }
        assert!(session.is_last());
        session.goto(usize::MAX);
        session.next();
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn test_next_then_previous_restores_index() {
        let mut session = associate_session();
        session.goto(1);
        session.next();
        session.previous();
        assert_eq!(session.current_index(), 1);
        session.previous();
        session.next();
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn test_submit_correct_answer() {
        let mut session = associate_session();
        let response = session.submit_answer("q1", "B").unwrap();
        assert!(response.is_correct);

        let summary = session.summary();
        assert_eq!(summary.correct, 1);
        assert_eq!(summary.incorrect, 0);
        assert_eq!(summary.attempted, 1);
    }

    #[test]
    fn test_submit_unknown_question_fails() {
        let mut session = associate_session();
        assert_matches!(
            session.submit_answer("p1", "C"),
            Err(SessionError::UnknownQuestion { question_id }) if question_id == "p1"
        );
        assert_eq!(session.responses().count(), 0);
    }

    #[test]
    fn test_resubmit_overwrites() {
        let mut session = associate_session();
        session.submit_answer("q2", "A").unwrap();
        session.submit_answer("q2", "C").unwrap();

        assert_eq!(session.answers().count(), 1);
        let r = session.response_for("q2").unwrap();
        assert_eq!(r.selected_choice.as_deref(), Some("C"));
        assert!(!r.is_correct);

        let summary = session.summary();
        assert_eq!(summary.correct, 0);
        assert_eq!(summary.incorrect, 1);
    }

    #[test]
    fn test_mark_then_answer_keeps_mark() {
        let mut session = associate_session();
        assert!(session.toggle_mark("q2"));
        assert_eq!(session.status_of("q2"), QuestionStatus::Marked);

        session.submit_answer("q2", "A").unwrap();
        let r = session.response_for("q2").unwrap();
        assert!(r.is_marked_for_review);
        assert!(r.is_correct);
        assert_eq!(session.status_of("q2"), QuestionStatus::Marked);
    }

    #[test]
    fn test_mark_only_entry_is_not_attempted() {
        let mut session = associate_session();
        session.toggle_mark("q3");

        assert_eq!(session.responses().count(), 1);
        assert_eq!(session.answers().count(), 0);
        let summary = session.summary();
        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.incorrect, 0);
    }

    #[test]
    fn test_toggle_mark_twice_clears() {
        let mut session = associate_session();
        assert!(session.toggle_mark("q1"));
        assert!(!session.toggle_mark("q1"));
        assert_eq!(session.status_of("q1"), QuestionStatus::Unanswered);
        session.submit_answer("q1", "A").unwrap();
        assert_eq!(session.status_of("q1"), QuestionStatus::Answered);
    }

    #[test]
    fn test_toggle_mark_unknown_is_ignored() {
        let mut session = associate_session();
        assert!(!session.toggle_mark("nope"));
        assert_eq!(session.responses().count(), 0);
    }

    #[test]
    fn test_answer_current_and_mark_current() {
        let mut session = associate_session();
        session.goto(2);
        assert!(session.answer_current("D").unwrap().is_correct);
        assert!(session.toggle_mark_current());
        assert_eq!(session.status_of("q3"), QuestionStatus::Marked);
    }

    #[test]
    fn test_summary_invariants() {
        let mut session = associate_session();
        session.submit_answer("q1", "B").unwrap();
        session.submit_answer("q2", "D").unwrap();
        session.toggle_mark("q3");

        let summary = session.summary();
        assert_eq!(summary.attempted, session.answers().count());
        assert_eq!(summary.correct + summary.incorrect, summary.attempted);
        assert_eq!(summary.total, 3);
        assert!((summary.score_percent - 100.0 / 3.0).abs() < 1e-9);
        assert!((summary.accuracy_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_empty_session_is_zero() {
        let summary = associate_session().summary();
        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.score_percent, 0.0);
        assert_eq!(summary.accuracy_percent, 0.0);
    }

    #[test]
    fn test_elapsed_tracks_clock_until_finished() {
        let mut session = associate_session();
        let start = session.started_at();

        let s = session.summary_at(start + Duration::seconds(90));
        assert_eq!(s.elapsed, Duration::seconds(90));

        session.finish(start + Duration::seconds(120));
        assert!(session.is_finished());
        let s = session.summary_at(start + Duration::seconds(600));
        assert_eq!(s.elapsed, Duration::seconds(120));

        // finishing again keeps the first finish time
        session.finish(start + Duration::seconds(900));
        assert_eq!(session.elapsed_at(start), Duration::seconds(120));
    }

    #[test]
    fn test_elapsed_never_negative() {
        let session = associate_session();
        let before = session.started_at() - Duration::seconds(5);
        assert_eq!(session.elapsed_at(before), Duration::zero());
    }

    #[test]
    fn test_domain_breakdown() {
        let mut session = associate_session();
        session.submit_answer("q1", "B").unwrap();
        session.submit_answer("q3", "A").unwrap();
        session.submit_answer("q2", "A").unwrap();

        let breakdown = session.domain_breakdown();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].domain, "Delta Lake");
        assert_eq!(breakdown[0].total, 2);
        assert_eq!(breakdown[0].attempted, 2);
        assert_eq!(breakdown[0].correct, 1);
        assert_eq!(breakdown[0].incorrect(), 1);
        assert_eq!(breakdown[0].score_percent(), 50.0);
        assert_eq!(breakdown[1].domain, "Spark SQL");
        assert_eq!(breakdown[1].correct, 1);
    }

    #[test]
    fn test_review_items_follow_session_order() {
        let mut session = associate_session();
        session.submit_answer("q2", "A").unwrap();
        let items: Vec<_> = session.review_items().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].0, 1);
        assert_eq!(items[1].1.question_id, "q2");
        assert!(items[1].2.is_some());
        assert!(items[0].2.is_none());
    }

    #[test]
    fn test_from_parts_drops_unknown_responses() {
        let pool = mixed_pool();
        let questions: Vec<_> = pool
            .iter()
            .filter(|q| q.difficulty == ExamType::Professional)
            .cloned()
            .collect();
        let mut responses = HashMap::new();
        responses.insert("p1".to_string(), Response::default());
        responses.insert("gone".to_string(), Response::default());

        let session = Session::from_parts(
            "u".into(),
            ExamType::Professional,
            questions,
            responses,
            Utc::now(),
            None,
        )
        .unwrap();
        assert_eq!(session.responses().count(), 1);
        assert!(session.response_for("gone").is_none());
    }
}
