//! HTTP client for the insights backend.
//!
//! One [`Backend`] owns one pooled `reqwest::Client` and speaks the single
//! canonical contract:
//!
//! | Method | Path                    | Body                  |
//! |--------|-------------------------|-----------------------|
//! | POST   | `/run_pipeline/`        | multipart, `files` ×N |
//! | GET    | `/get-final-summaries/` | —                     |
//! | GET    | `/get-comparisons/`     | —                     |
//! | GET    | `/get-top-questions/`   | —                     |
//! | GET    | `/get-table-visuals/`   | —                     |
//! | POST   | `/ask-question/`        | `{"question": …}`     |
//!
//! The four GETs are also reachable through [`ResultSource`], the seam the
//! poller is written against.

use crate::config::ClientConfig;
use crate::error::InsightsError;
use crate::model::{Answer, Comparisons, QuestionRequest, Slot, Summaries, TableVisuals, TopQuestions};
use crate::upload::UploadBatch;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

pub const RUN_PIPELINE_PATH: &str = "/run_pipeline/";
pub const ASK_QUESTION_PATH: &str = "/ask-question/";

/// Anything that can produce the four poll resources.
///
/// Implemented by [`Backend`]; tests substitute in-memory sources.
#[async_trait]
pub trait ResultSource: Send + Sync {
    async fn fetch_summaries(&self) -> Result<Summaries, InsightsError>;
    async fn fetch_comparisons(&self) -> Result<Comparisons, InsightsError>;
    async fn fetch_top_questions(&self) -> Result<TopQuestions, InsightsError>;
    async fn fetch_table_visuals(&self) -> Result<TableVisuals, InsightsError>;
}

/// Client for one backend deployment.
#[derive(Debug, Clone)]
pub struct Backend {
    client: reqwest::Client,
    base_url: String,
    request_timeout_secs: u64,
    upload_timeout_secs: u64,
}

impl Backend {
    /// Build a client from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, InsightsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InsightsError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            request_timeout_secs: config.request_timeout_secs,
            upload_timeout_secs: config.upload_timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a pipeline run over every file in `batch`.
    ///
    /// The success payload is opaque; a body that is not JSON comes back as
    /// a `Value::String`.
    pub async fn run_pipeline(
        &self,
        batch: &UploadBatch,
    ) -> Result<serde_json::Value, InsightsError> {
        if batch.is_empty() {
            return Err(InsightsError::NoFilesSelected);
        }
        info!(
            "Uploading {} file(s), {} bytes",
            batch.len(),
            batch.total_bytes()
        );

        let request = self
            .client
            .post(self.url(RUN_PIPELINE_PATH))
            .timeout(Duration::from_secs(self.upload_timeout_secs))
            .multipart(batch.to_form()?);

        let response = self
            .send(request, RUN_PIPELINE_PATH, self.upload_timeout_secs)
            .await?;
        let text = response.text().await.map_err(|e| InsightsError::Decode {
            endpoint: RUN_PIPELINE_PATH.to_string(),
            reason: e.to_string(),
        })?;

        info!("Pipeline run started");
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    /// Ask a question against the uploaded corpus.
    pub async fn ask_question(&self, question: &str) -> Result<Answer, InsightsError> {
        debug!("Asking: {}", question);
        let request = self
            .client
            .post(self.url(ASK_QUESTION_PATH))
            .json(&QuestionRequest { question });
        let response = self
            .send(request, ASK_QUESTION_PATH, self.request_timeout_secs)
            .await?;
        decode::<Answer>(response, ASK_QUESTION_PATH).await
    }

    async fn get_slot<T: DeserializeOwned + Default>(&self, slot: Slot) -> Result<T, InsightsError> {
        let path = slot.path();
        debug!("GET {}", path);
        let response = self
            .send(self.client.get(self.url(path)), path, self.request_timeout_secs)
            .await?;
        // `null` means "nothing yet".
        let payload: Option<T> = decode(response, path).await?;
        Ok(payload.unwrap_or_default())
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
        timeout_secs: u64,
    ) -> Result<reqwest::Response, InsightsError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InsightsError::Timeout {
                    endpoint: endpoint.to_string(),
                    secs: timeout_secs,
                }
            } else {
                InsightsError::Request {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightsError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ResultSource for Backend {
    async fn fetch_summaries(&self) -> Result<Summaries, InsightsError> {
        self.get_slot(Slot::Summaries).await
    }

    async fn fetch_comparisons(&self) -> Result<Comparisons, InsightsError> {
        self.get_slot(Slot::Comparisons).await
    }

    async fn fetch_top_questions(&self) -> Result<TopQuestions, InsightsError> {
        self.get_slot(Slot::TopQuestions).await
    }

    async fn fetch_table_visuals(&self) -> Result<TableVisuals, InsightsError> {
        self.get_slot(Slot::TableVisuals).await
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: &str,
) -> Result<T, InsightsError> {
    let bytes = response.bytes().await.map_err(|e| InsightsError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| InsightsError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('\u{2026}');
        out
    }
}
