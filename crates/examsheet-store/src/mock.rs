//! Mock Response Store for testing.
//!
//! Behaves like the real web app (duplicate rejection, window
//! enforcement, grading on submit) without the network. The clock is
//! injectable so window tests stay deterministic, and transient failures
//! can be scripted to exercise retry paths.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use examsheet_core::error::{RejectCode, StoreError};
use examsheet_core::grading::grade;
use examsheet_core::model::{
    join_answer_list, DashboardRecord, ExamDefinition, Score, WindowStatus,
};
use examsheet_core::traits::{ExamCatalog, ResponseStore, SubmitRequest};

#[derive(Default)]
struct MockState {
    exams: HashMap<String, ExamDefinition>,
    active: Option<String>,
    records: Vec<(String, DashboardRecord)>,
    teacher_key: String,
    now: Option<DateTime<Utc>>,
    fail_submits: VecDeque<StoreError>,
}

/// An in-memory Response Store.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<MockState>,
    submissions: AtomicU32,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_teacher_key(key: &str) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().teacher_key = key.to_string();
        store
    }

    /// Register an exam; the first registered exam becomes active.
    pub fn insert_exam(&self, exam: ExamDefinition) {
        let mut state = self.state.lock().unwrap();
        if state.active.is_none() {
            state.active = Some(exam.exam_id.clone());
        }
        state.exams.insert(exam.exam_id.clone(), exam);
    }

    /// Pin the store clock for window enforcement.
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.state.lock().unwrap().now = Some(now);
    }

    /// Script a failure for the next `submit` call.
    pub fn fail_next_submit(&self, err: StoreError) {
        self.state.lock().unwrap().fail_submits.push_back(err);
    }

    /// How many `submit` calls reached the store.
    pub fn submission_count(&self) -> u32 {
        self.submissions.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ResponseStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_active_exam(&self) -> Result<ExamDefinition, StoreError> {
        let state = self.state.lock().unwrap();
        state
            .active
            .as_ref()
            .and_then(|id| state.exams.get(id))
            .cloned()
            .ok_or(StoreError::Rejected(RejectCode::Other(
                "NO_ACTIVE_EXAM".into(),
            )))
    }

    async fn get_config(&self) -> Result<ExamCatalog, StoreError> {
        let state = self.state.lock().unwrap();
        let mut exams: Vec<ExamDefinition> = state.exams.values().cloned().collect();
        exams.sort_by(|a, b| a.exam_id.cmp(&b.exam_id));
        Ok(ExamCatalog {
            exams,
            active_exam_id: state.active.clone().unwrap_or_default(),
        })
    }

    async fn get_dashboard(&self, exam_id: &str) -> Result<Vec<DashboardRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|(id, _)| id == exam_id)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn set_active_exam(&self, exam_id: &str, teacher_key: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if teacher_key != state.teacher_key {
            return Err(StoreError::Rejected(RejectCode::Unauthorized));
        }
        if !state.exams.contains_key(exam_id) {
            return Err(StoreError::Rejected(RejectCode::Other(
                "UNKNOWN_EXAM".into(),
            )));
        }
        state.active = Some(exam_id.to_string());
        Ok(())
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<Score, StoreError> {
        self.submissions.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap();

        if let Some(err) = state.fail_submits.pop_front() {
            return Err(err);
        }

        let Some(exam) = state.exams.get(&request.exam_id).cloned() else {
            return Err(StoreError::Rejected(RejectCode::Other(
                "UNKNOWN_EXAM".into(),
            )));
        };

        let now = state.now.unwrap_or_else(Utc::now);
        if let Some(window) = exam.window() {
            match window.status(now) {
                WindowStatus::NotYetOpen => {
                    return Err(StoreError::Rejected(RejectCode::BeforeWindow))
                }
                WindowStatus::Closed => {
                    return Err(StoreError::Rejected(RejectCode::AfterWindow))
                }
                WindowStatus::Open => {}
            }
        }

        // The store-side uniqueness constraint on (exam_id, student_name).
        let name = request.student_name.trim();
        let duplicate = state.records.iter().any(|(id, record)| {
            id == &request.exam_id && record.student_name.trim() == name
        });
        if duplicate {
            return Err(StoreError::Rejected(RejectCode::DuplicateSubmission));
        }

        let qn = exam.question_count as usize;
        let Some(key) = exam.declared_key(qn) else {
            return Err(StoreError::Rejected(RejectCode::Other(
                "NO_ANSWER_KEY".into(),
            )));
        };
        let score = grade(qn, &key, &request.answers)
            .map_err(|e| StoreError::Rejected(RejectCode::Other(e.to_string())))?;

        state.records.push((
            request.exam_id.clone(),
            DashboardRecord {
                timestamp: Some(now),
                student_name: name.to_string(),
                score: Some(score.raw),
                percent: Some(score.percent),
                answers: join_answer_list(&request.answers),
                detail: Some(score.detail.clone()),
            },
        ));

        Ok(score)
    }
}
