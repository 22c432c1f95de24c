// Bank -> session -> store -> history, across "process restarts" simulated by
// reopening the file-backed stores.

use std::fs;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use tempfile::tempdir;

use certprep::bank::QuestionBank;
use certprep::error::{BankError, SessionError};
use certprep::history::{AttemptRecord, HistoryDb};
use certprep::question::ExamType;
use certprep::session::{start_session, Session};
use certprep::store::{FileSessionStore, SessionStore};

const ASSOCIATE_BANK: &str = r#"[
  {
    "question_id": "T-1",
    "domain": "Delta Lake",
    "question_text": "Which command removes stale files?",
    "choices": {"A": "VACUUM", "B": "OPTIMIZE"},
    "correct_answer": "A",
    "explanation": "VACUUM deletes unreferenced files."
  },
  {
    "question_id": "T-2",
    "domain": "Spark SQL",
    "question_text": "Which clause filters groups?",
    "choices": ["WHERE", "HAVING", "QUALIFY"],
    "correct_answer": 1,
    "explanation": {"correct": "HAVING filters after aggregation.", "options": {"A": "WHERE filters rows."}}
  },
  {
    "question_id": "T-3",
    "domain": "Delta Lake",
    "question_text": "Which feature restores an earlier table version?",
    "choices": {"A": "Time travel", "B": "Auto Loader"},
    "correct_answer": "A",
    "explanation": "RESTORE uses the transaction log."
  }
]"#;

#[test]
fn bank_dir_with_one_exam() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("associate.json"), ASSOCIATE_BANK).unwrap();

    let bank = QuestionBank::from_dir(dir.path()).unwrap();
    assert_eq!(bank.count_for(ExamType::Associate), 3);
    assert_eq!(bank.count_for(ExamType::Professional), 0);

    let q2 = bank.get(ExamType::Associate, "T-2").unwrap();
    assert_eq!(q2.correct_answer, "B");
    assert_eq!(q2.correct_choice().unwrap().text, "HAVING");
    assert_eq!(q2.explanation.for_option("A"), Some("WHERE filters rows."));

    assert_matches!(
        start_session(ExamType::Professional, bank.pool()),
        Err(SessionError::EmptyPool {
            exam: ExamType::Professional
        })
    );
}

#[test]
fn empty_bank_dir_is_not_found() {
    let dir = tempdir().unwrap();
    assert_matches!(
        QuestionBank::from_dir(dir.path()),
        Err(BankError::NotFound(_))
    );
}

#[test]
fn embedded_banks_cover_both_exams() {
    let bank = QuestionBank::embedded().unwrap();
    assert_eq!(bank.count_for(ExamType::Associate), 8);
    assert_eq!(bank.count_for(ExamType::Professional), 6);
    for q in bank.pool() {
        assert!(q.validate().is_ok(), "{} is invalid", q.question_id);
    }
}

#[test]
fn session_survives_restart_and_is_recorded() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("associate.json"), ASSOCIATE_BANK).unwrap();
    let state_path = dir.path().join("state").join("state.json");
    let db_path = dir.path().join("state").join("history.db");

    let bank = QuestionBank::from_dir(dir.path()).unwrap();

    // first run: answer two, mark one, quit
    {
        let mut session = Session::start("alex", ExamType::Associate, bank.pool()).unwrap();
        session.submit_answer("T-1", "A").unwrap();
        session.submit_answer("T-2", "C").unwrap();
        session.toggle_mark("T-3");
        session.goto(2);
        FileSessionStore::with_path(&state_path).save(&session).unwrap();
    }

    // second run: resume, fix the wrong answer, finish
    let store = FileSessionStore::with_path(&state_path);
    let saved = store.load("alex", ExamType::Associate).unwrap().unwrap();
    let mut session = saved.restore(bank.pool()).unwrap();
    assert_eq!(session.current_index(), 0);
    assert_eq!(session.summary().attempted, 2);
    assert_eq!(session.summary().correct, 1);

    let response = session.submit_answer("T-2", "B").unwrap();
    assert!(response.is_correct);
    let finished_at = session.started_at() + Duration::minutes(12);
    session.finish(finished_at);
    store.save(&session).unwrap();

    let summary = session.summary();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.correct, 2);
    assert!((summary.score_percent - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.accuracy_percent, 100.0);
    assert_eq!(summary.elapsed, Duration::minutes(12));

    {
        let mut db = HistoryDb::open(&db_path).unwrap();
        db.record_attempt(&AttemptRecord::from_session(&session, Utc::now()))
            .unwrap();
    }

    let db = HistoryDb::open(&db_path).unwrap();
    let last = db.last_attempt("alex", ExamType::Associate).unwrap().unwrap();
    assert_eq!(last.correct, 2);
    assert_eq!(last.total, 3);
    assert_eq!(last.elapsed_secs, 12 * 60);
    assert_eq!(last.finished_at, finished_at);
    assert_eq!(last.domains.len(), 2);

    let totals = db.domain_totals("alex", ExamType::Associate).unwrap();
    let delta = totals.iter().find(|t| t.domain == "Delta Lake").unwrap();
    assert_eq!(delta.answered, 1);
    assert_eq!(delta.correct, 1);

    // the finished session comes back finished
    let again = store
        .load("alex", ExamType::Associate)
        .unwrap()
        .unwrap()
        .restore(bank.pool())
        .unwrap();
    assert!(again.is_finished());
    assert_eq!(again.summary().elapsed, Duration::minutes(12));
}
