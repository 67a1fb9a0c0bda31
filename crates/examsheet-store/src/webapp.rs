//! The spreadsheet-backed web app behind the Response Store.
//!
//! Every action is reached as `{base_url}?action=<name>`: reads are GET
//! with extra query parameters, writes are POST with a JSON body. The
//! response is always the tagged envelope `{ok: true, data: ...}` or
//! `{ok: false, error: CODE}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use examsheet_core::error::{RejectCode, StoreError};
use examsheet_core::model::{DashboardRecord, ExamDefinition, Score};
use examsheet_core::traits::{ExamCatalog, ResponseStore, SubmitRequest};

use crate::config::SheetConfig;

const DEFAULT_TIMEOUT_SECS: u64 = 25;
const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the Response Store web app.
pub struct WebAppStore {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
    submit_timeout_secs: u64,
}

impl WebAppStore {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT_SECS, DEFAULT_SUBMIT_TIMEOUT_SECS)
    }

    pub fn with_timeouts(base_url: &str, timeout_secs: u64, submit_timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('?').to_string(),
            client,
            timeout_secs,
            submit_timeout_secs,
        }
    }

    pub fn from_config(config: &SheetConfig) -> Self {
        Self::with_timeouts(
            &config.webapp_url,
            config.timeout_secs,
            config.submit_timeout_secs,
        )
    }

    fn classify(&self, err: reqwest::Error, timeout_secs: u64) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout(timeout_secs)
        } else if err.is_connect() {
            StoreError::Network(format!(
                "store not reachable at {}: {err}",
                self.base_url
            ))
        } else {
            StoreError::Network(err.to_string())
        }
    }

    async fn read_envelope(&self, response: reqwest::Response) -> Result<Value, StoreError> {
        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message });
        }
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        if !envelope.ok {
            let code = envelope
                .error
                .ok_or_else(|| StoreError::Malformed("ok:false without an error code".into()))?;
            return Err(StoreError::Rejected(RejectCode::from_code(&code)));
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    async fn get_action<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T, StoreError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("action", action)])
            .query(params)
            .send()
            .await
            .map_err(|e| self.classify(e, self.timeout_secs))?;
        let data = self.read_envelope(response).await?;
        serde_json::from_value(data).map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn post_action(
        &self,
        action: &str,
        body: &Value,
        timeout_secs: u64,
    ) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(&self.base_url)
            .query(&[("action", action)])
            .timeout(Duration::from_secs(timeout_secs))
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e, timeout_secs))?;
        self.read_envelope(response).await
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl ResponseStore for WebAppStore {
    fn name(&self) -> &str {
        "webapp"
    }

    #[instrument(skip(self))]
    async fn get_active_exam(&self) -> Result<ExamDefinition, StoreError> {
        self.get_action("get_active_exam", &[]).await
    }

    #[instrument(skip(self))]
    async fn get_config(&self) -> Result<ExamCatalog, StoreError> {
        self.get_action("get_config", &[]).await
    }

    #[instrument(skip(self))]
    async fn get_dashboard(&self, exam_id: &str) -> Result<Vec<DashboardRecord>, StoreError> {
        let rows: Vec<Value> = self
            .get_action("get_dashboard", &[("exam_id", exam_id)])
            .await?;
        // One corrupt row must not take the dashboard down with it.
        let mut records = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            match serde_json::from_value::<DashboardRecord>(row) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(exam_id, row = i, "skipping malformed record: {e}"),
            }
        }
        Ok(records)
    }

    #[instrument(skip(self, teacher_key))]
    async fn set_active_exam(&self, exam_id: &str, teacher_key: &str) -> Result<(), StoreError> {
        let body = serde_json::json!({
            "exam_id": exam_id,
            "teacher_key": teacher_key,
        });
        self.post_action("set_active_exam", &body, self.timeout_secs)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(exam_id = %request.exam_id))]
    async fn submit(&self, request: &SubmitRequest) -> Result<Score, StoreError> {
        let body = serde_json::to_value(request)
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        let data = self
            .post_action("submit", &body, self.submit_timeout_secs)
            .await?;
        serde_json::from_value(data).map_err(|e| StoreError::Malformed(e.to_string()))
    }
}
