//! The Response Store trait seam.
//!
//! The store is the external system of record for exam definitions and
//! submitted answers. This async trait is implemented by the
//! `examsheet-store` crate (HTTP web app and in-memory mock); the core
//! state machine and aggregator only ever see the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{Answer, DashboardRecord, ExamDefinition, Score};

/// The named actions the Response Store exposes.
///
/// Every action resolves to the store's tagged envelope; a
/// `{ok: false, error: CODE}` response surfaces as
/// [`StoreError::Rejected`] with the exact code.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Human-readable store name for logs.
    fn name(&self) -> &str;

    /// The exam set currently selected for students.
    async fn get_active_exam(&self) -> Result<ExamDefinition, StoreError>;

    /// The full exam catalog plus the active exam id.
    async fn get_config(&self) -> Result<ExamCatalog, StoreError>;

    /// All submitted records for one exam.
    async fn get_dashboard(&self, exam_id: &str) -> Result<Vec<DashboardRecord>, StoreError>;

    /// Select the active exam. Requires the shared teacher key.
    async fn set_active_exam(&self, exam_id: &str, teacher_key: &str) -> Result<(), StoreError>;

    /// Submit one answer sheet. The store is the single source of truth
    /// for duplicate detection, keyed by `(exam_id, student_name)`.
    async fn submit(&self, request: &SubmitRequest) -> Result<Score, StoreError>;
}

/// Payload of the `submit` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub exam_id: String,
    pub student_name: String,
    pub answers: Vec<Answer>,
}

/// Result of the `get_config` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamCatalog {
    #[serde(default)]
    pub exams: Vec<ExamDefinition>,
    /// Empty when no exam has been activated yet.
    #[serde(default)]
    pub active_exam_id: String,
}

impl ExamCatalog {
    pub fn active(&self) -> Option<&str> {
        if self.active_exam_id.is_empty() {
            None
        } else {
            Some(&self.active_exam_id)
        }
    }

    pub fn find(&self, exam_id: &str) -> Option<&ExamDefinition> {
        self.exams.iter().find(|e| e.exam_id == exam_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_active_handles_empty_id() {
        let catalog: ExamCatalog = serde_json::from_value(serde_json::json!({
            "exams": [{"exam_id": "quiz-1", "title": "Quiz 1", "question_count": 5}],
            "active_exam_id": ""
        }))
        .unwrap();
        assert!(catalog.active().is_none());
        assert!(catalog.find("quiz-1").is_some());
        assert!(catalog.find("quiz-2").is_none());

        let catalog: ExamCatalog = serde_json::from_value(serde_json::json!({
            "exams": [],
            "active_exam_id": "quiz-1"
        }))
        .unwrap();
        assert_eq!(catalog.active(), Some("quiz-1"));
    }

    #[test]
    fn submit_request_wire_shape() {
        let request = SubmitRequest {
            exam_id: "quiz-1".into(),
            student_name: "Mali".into(),
            answers: crate::model::parse_answer_list("A,,C"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["exam_id"], "quiz-1");
        assert_eq!(json["answers"][0], "A");
        assert_eq!(json["answers"][1], "");
    }
}
