//! Error types for the examsheet core.
//!
//! `StoreError` is defined here rather than in the store crate so the
//! submission state machine can classify rejections structurally instead
//! of matching on rendered strings.

use std::fmt;

use thiserror::Error;

/// Exact rejection codes the Response Store returns in its
/// `{ok: false, error: CODE}` envelope. The code strings are part of the
/// store contract and round-trip verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectCode {
    DuplicateSubmission,
    BeforeWindow,
    AfterWindow,
    Unauthorized,
    /// Any code this client does not recognize.
    Other(String),
}

impl RejectCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "DUPLICATE_SUBMISSION" => RejectCode::DuplicateSubmission,
            "BEFORE_WINDOW" => RejectCode::BeforeWindow,
            "AFTER_WINDOW" => RejectCode::AfterWindow,
            "UNAUTHORIZED" => RejectCode::Unauthorized,
            other => RejectCode::Other(other.to_string()),
        }
    }

    pub fn as_code(&self) -> &str {
        match self {
            RejectCode::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            RejectCode::BeforeWindow => "BEFORE_WINDOW",
            RejectCode::AfterWindow => "AFTER_WINDOW",
            RejectCode::Unauthorized => "UNAUTHORIZED",
            RejectCode::Other(code) => code,
        }
    }

    /// Whether the store's answer can change within the same session.
    /// Unknown codes are treated as transient so a retry stays possible.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, RejectCode::Other(_))
    }
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Errors that can occur when talking to the Response Store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store processed the request and said no.
    #[error("store rejected the request: {0}")]
    Rejected(RejectCode),

    /// The transport returned an HTTP error status.
    #[error("store API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body was not the expected envelope.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Returns `true` if this error is permanent for the current session
    /// and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(self, StoreError::Rejected(code) if code.is_permanent())
    }

    pub fn reject_code(&self) -> Option<&RejectCode> {
        match self {
            StoreError::Rejected(code) => Some(code),
            _ => None,
        }
    }
}

/// Grading preconditions on the authoritative (server-trusted) key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    #[error("invalid exam: {0}")]
    InvalidExam(String),
}

/// Local input errors: recovered in the form, never sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("student name must not be empty")]
    EmptyName,

    #[error("no submission has been armed yet")]
    NotArmed,

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("the session is locked")]
    SessionLocked,

    #[error("question {question} is out of range for a {count}-question exam")]
    QuestionOutOfRange { question: usize, count: usize },

    #[error("submissions are not accepted now: {0}")]
    OutsideWindow(RejectCode),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_codes_round_trip_exactly() {
        for code in [
            "DUPLICATE_SUBMISSION",
            "BEFORE_WINDOW",
            "AFTER_WINDOW",
            "UNAUTHORIZED",
        ] {
            let parsed = RejectCode::from_code(code);
            assert_eq!(parsed.as_code(), code);
            assert!(parsed.is_permanent());
        }
        let unknown = RejectCode::from_code("SHEET_FULL");
        assert_eq!(unknown, RejectCode::Other("SHEET_FULL".into()));
        assert!(!unknown.is_permanent());
        // Codes match exactly, never loosely.
        assert!(matches!(
            RejectCode::from_code("duplicate_submission"),
            RejectCode::Other(_)
        ));
    }

    #[test]
    fn only_recognized_rejections_are_permanent() {
        assert!(StoreError::Rejected(RejectCode::DuplicateSubmission).is_permanent());
        assert!(StoreError::Rejected(RejectCode::Unauthorized).is_permanent());
        assert!(!StoreError::Rejected(RejectCode::Other("HUH".into())).is_permanent());
        assert!(!StoreError::Timeout(25).is_permanent());
        assert!(!StoreError::Network("connection refused".into()).is_permanent());
        assert!(!StoreError::Malformed("not json".into()).is_permanent());
    }
}
