//! The submission protocol: one exam attempt per client session.
//!
//! [`ExamSession`] is an explicit per-session context object, so
//! concurrent student sessions on a shared process stay isolated.
//! The state machine is advisory: the Response Store remains the single
//! source of truth for duplicate detection and window enforcement, and
//! these transitions only decide what the local form may still do.
//!
//! ```text
//! Idle -> Armed -> InFlight -> LockedSuccess
//!                           -> LockedFailed    (permanent rejection)
//!                           -> RetryableError  (-> InFlight again)
//! ```

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{RejectCode, SessionError, StoreError};
use crate::model::{Answer, ExamDefinition, Score, WindowStatus};
use crate::traits::{ResponseStore, SubmitRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Editing, nothing staged.
    Idle,
    /// Payload staged locally, ready to transmit.
    Armed,
    /// One request outstanding; all inputs disabled.
    InFlight,
    /// Server accepted; score available; inputs disabled for good.
    LockedSuccess,
    /// Permanently rejected; inputs disabled for good.
    LockedFailed,
    /// Transient failure; inputs re-enabled, resubmission allowed.
    RetryableError,
}

/// Per-session context for one student's attempt at one exam.
#[derive(Debug)]
pub struct ExamSession {
    session_id: Uuid,
    exam: ExamDefinition,
    student_name: Option<String>,
    answers: Vec<Answer>,
    state: SessionState,
    result: Option<Score>,
    last_error: Option<StoreError>,
}

impl ExamSession {
    pub fn new(exam: ExamDefinition) -> Self {
        let slots = exam.question_count as usize;
        Self {
            session_id: Uuid::new_v4(),
            exam,
            student_name: None,
            answers: vec![Answer::BLANK; slots],
            state: SessionState::Idle,
            result: None,
            last_error: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn exam(&self) -> &ExamDefinition {
        &self.exam
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn student_name(&self) -> Option<&str> {
        self.student_name.as_deref()
    }

    /// The score, once the session reached `LockedSuccess`.
    pub fn result(&self) -> Option<&Score> {
        self.result.as_ref()
    }

    /// The most recent store error, kept across a retry.
    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    /// Whether the form may still be edited and submitted.
    pub fn inputs_enabled(&self) -> bool {
        !matches!(
            self.state,
            SessionState::InFlight | SessionState::LockedSuccess | SessionState::LockedFailed
        )
    }

    /// Window eligibility at `now`. No window means unrestricted.
    pub fn window_status(&self, now: DateTime<Utc>) -> WindowStatus {
        self.exam
            .window()
            .map(|w| w.status(now))
            .unwrap_or(WindowStatus::Open)
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::InFlight => Err(SessionError::SubmissionInFlight),
            SessionState::LockedSuccess | SessionState::LockedFailed => {
                Err(SessionError::SessionLocked)
            }
            _ => Ok(()),
        }
    }

    /// Record an answer for a 1-based question number.
    pub fn set_answer(&mut self, question: usize, answer: Answer) -> Result<(), SessionError> {
        self.ensure_editable()?;
        if question == 0 || question > self.answers.len() {
            return Err(SessionError::QuestionOutOfRange {
                question,
                count: self.answers.len(),
            });
        }
        self.answers[question - 1] = answer;
        Ok(())
    }

    fn lock_rejected(&mut self, code: RejectCode) {
        self.last_error = Some(StoreError::Rejected(code));
        self.state = SessionState::LockedFailed;
    }

    /// Check the window; outside it the session locks immediately, since
    /// the authoritative answer cannot change within this session.
    fn enforce_window(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        let code = match self.window_status(now) {
            WindowStatus::Open => return Ok(()),
            WindowStatus::NotYetOpen => RejectCode::BeforeWindow,
            WindowStatus::Closed => RejectCode::AfterWindow,
        };
        self.lock_rejected(code.clone());
        Err(SessionError::OutsideWindow(code))
    }

    /// `Idle -> Armed`: stage the payload. Requires a non-empty trimmed
    /// student name; an empty name leaves the state untouched.
    pub fn arm(&mut self, name: &str, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptyName);
        }
        self.enforce_window(now)?;
        self.student_name = Some(trimmed.to_string());
        self.state = SessionState::Armed;
        Ok(())
    }

    /// `Armed -> InFlight`: re-check the window at the moment of
    /// transmission (render-time eligibility is not trusted), then stage
    /// the wire request. Also valid from `RetryableError`, where the
    /// armed name is still in place.
    pub fn begin_transmit(&mut self, now: DateTime<Utc>) -> Result<SubmitRequest, SessionError> {
        match self.state {
            SessionState::Armed | SessionState::RetryableError => {}
            SessionState::Idle => return Err(SessionError::NotArmed),
            SessionState::InFlight => return Err(SessionError::SubmissionInFlight),
            SessionState::LockedSuccess | SessionState::LockedFailed => {
                return Err(SessionError::SessionLocked)
            }
        }
        let Some(student_name) = self.student_name.clone() else {
            return Err(SessionError::NotArmed);
        };
        self.enforce_window(now)?;
        self.state = SessionState::InFlight;
        Ok(SubmitRequest {
            exam_id: self.exam.exam_id.clone(),
            student_name,
            answers: self.answers.clone(),
        })
    }

    /// `InFlight -> LockedSuccess | LockedFailed | RetryableError`.
    pub fn complete_transmit(&mut self, outcome: Result<Score, StoreError>) -> SessionState {
        debug_assert_eq!(self.state, SessionState::InFlight);
        self.state = match outcome {
            Ok(score) => {
                self.result = Some(score);
                self.last_error = None;
                SessionState::LockedSuccess
            }
            Err(err) if err.is_permanent() => {
                self.last_error = Some(err);
                SessionState::LockedFailed
            }
            Err(err) => {
                self.last_error = Some(err);
                SessionState::RetryableError
            }
        };
        self.state
    }

    /// Abandon an in-flight attempt client-side. The store may still have
    /// accepted it; a later resubmission would then be rejected as a
    /// duplicate, which is the store's call to make.
    pub fn cancel_in_flight(&mut self) {
        if self.state == SessionState::InFlight {
            self.state = SessionState::RetryableError;
        }
    }

    /// Run one full transmission against the store.
    ///
    /// Store failures are absorbed into the state machine; the returned
    /// `Err` is reserved for caller misuse (not armed, already in
    /// flight, locked). A window violation at send time is a state
    /// transition, not an error.
    pub async fn transmit(
        &mut self,
        store: &dyn ResponseStore,
        now: DateTime<Utc>,
    ) -> Result<SessionState, SessionError> {
        let request = match self.begin_transmit(now) {
            Ok(request) => request,
            Err(SessionError::OutsideWindow(_)) => return Ok(self.state),
            Err(err) => return Err(err),
        };
        tracing::debug!(
            session = %self.session_id,
            exam = %request.exam_id,
            store = store.name(),
            "submitting answer sheet"
        );
        let outcome = store.submit(&request).await;
        Ok(self.complete_transmit(outcome))
    }
}

/// One submission attempt running on its own task, with a cancel handle.
///
/// The session moves into the task, which makes "exactly one outstanding
/// attempt per session" structural rather than a flag to police.
pub struct SubmissionTask {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<ExamSession>,
}

impl SubmissionTask {
    pub fn spawn(mut session: ExamSession, store: Arc<dyn ResponseStore>) -> Self {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let request = match session.begin_transmit(Utc::now()) {
                Ok(request) => request,
                Err(_) => return session,
            };
            tokio::select! {
                outcome = store.submit(&request) => {
                    session.complete_transmit(outcome);
                }
                _ = &mut cancel_rx => {
                    session.cancel_in_flight();
                }
            }
            session
        });
        Self {
            cancel: Some(cancel_tx),
            handle,
        }
    }

    /// Abandon the attempt. The session lands in `RetryableError`.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the attempt and hand the session context back.
    pub async fn join(self) -> anyhow::Result<ExamSession> {
        self.handle.await.context("submission task panicked")
    }
}
