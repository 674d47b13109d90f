//! One upload → poll → ask session against a backend.
//!
//! [`InsightsSession`] is the whole client component: it collects the upload
//! batch, submits it, owns the running poll, and keeps the latest results,
//! the Q&A session, and a status line for whatever front end renders it.
//!
//! Validation failures (nothing selected, blank question) never reach the
//! network. Transport failures degrade to a status message and leave
//! previously fetched results in place.

use crate::backend::{Backend, ResultSource};
use crate::config::ClientConfig;
use crate::error::InsightsError;
use crate::poll::{PollHandle, PollReport, PollStopper, Poller};
use crate::progress::Observer;
use crate::state::{PollState, QaSession};
use crate::upload::UploadBatch;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const MSG_PROCESSING_STARTED: &str = "Processing started. Fetching results...";
pub const MSG_PROCESSING_FAILED: &str = "Error during processing.";

/// Client-side state for one pipeline run and its questions.
pub struct InsightsSession {
    config: ClientConfig,
    backend: Arc<Backend>,
    batch: UploadBatch,
    status: String,
    processing: bool,
    poll: Option<PollHandle>,
    results: PollState,
    qa: QaSession,
}

impl InsightsSession {
    pub fn new(config: ClientConfig) -> Result<Self, InsightsError> {
        let backend = Arc::new(Backend::new(&config)?);
        Ok(Self {
            config,
            backend,
            batch: UploadBatch::new(),
            status: String::new(),
            processing: false,
            poll: None,
            results: PollState::new(),
            qa: QaSession::default(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn batch(&self) -> &UploadBatch {
        &self.batch
    }

    /// Current status line; empty when there is nothing to report.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Latest results across every run of this session. While a poll is
    /// running its slots are overlaid on what earlier runs fetched.
    pub fn results(&self) -> PollState {
        let mut results = self.results.clone();
        if let Some(handle) = &self.poll {
            results.absorb(&handle.state());
        }
        results
    }

    pub fn qa(&self) -> &QaSession {
        &self.qa
    }

    /// Overall top questions, offered as follow-ups.
    pub fn suggested_questions(&self) -> Vec<String> {
        self.results().overall_questions().to_vec()
    }

    // ── Batch ────────────────────────────────────────────────────────────

    /// Append a local path or URL to the batch.
    pub async fn add_input(&mut self, input: &str) -> Result<(), InsightsError> {
        self.batch
            .add_input(input, self.config.download_timeout_secs)
            .await?;
        self.status.clear();
        Ok(())
    }

    pub async fn add_path(&mut self, path: impl AsRef<Path>) -> Result<(), InsightsError> {
        self.batch.add_path(path).await?;
        self.status.clear();
        Ok(())
    }

    pub fn add_bytes(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), InsightsError> {
        self.batch.add_bytes(name, bytes)?;
        self.status.clear();
        Ok(())
    }

    // ── Upload + poll ────────────────────────────────────────────────────

    /// Upload the batch and start polling for results.
    ///
    /// Returns the backend's opaque acknowledgement. The poll runs in the
    /// background until [`InsightsSession::wait`] or
    /// [`InsightsSession::stop`].
    pub async fn submit(&mut self, observer: Observer) -> Result<serde_json::Value, InsightsError> {
        if self.batch.is_empty() {
            self.status = InsightsError::NoFilesSelected.to_string();
            return Err(InsightsError::NoFilesSelected);
        }
        if self.processing {
            return Err(InsightsError::AlreadyProcessing);
        }

        self.processing = true;
        let ack = match self.backend.run_pipeline(&self.batch).await {
            Ok(ack) => ack,
            Err(e) => {
                error!("Processing error: {}", e);
                self.processing = false;
                self.status = MSG_PROCESSING_FAILED.to_string();
                return Err(e);
            }
        };

        self.status = MSG_PROCESSING_STARTED.to_string();
        self.start_polling(observer)?;
        Ok(ack)
    }

    /// Poll for results without uploading, e.g. after a run started elsewhere.
    pub fn resume_polling(&mut self, observer: Observer) -> Result<(), InsightsError> {
        if self.processing {
            return Err(InsightsError::AlreadyProcessing);
        }
        self.processing = true;
        self.status = MSG_PROCESSING_STARTED.to_string();
        self.start_polling(observer)
    }

    fn start_polling(&mut self, observer: Observer) -> Result<(), InsightsError> {
        let source: Arc<dyn ResultSource> = self.backend.clone();
        let poller = match Poller::new(source, self.config.poll_settings()) {
            Ok(p) => p,
            Err(e) => {
                self.processing = false;
                return Err(e);
            }
        };
        self.poll = Some(poller.with_observer(observer).start());
        Ok(())
    }

    /// Wait for the running poll to finish and merge its results into the
    /// session's.
    ///
    /// Returns `None` when no poll is running. The report covers this run
    /// only; [`InsightsSession::results`] also keeps what earlier runs
    /// fetched.
    pub async fn wait(&mut self) -> Option<PollReport> {
        let handle = self.poll.take()?;
        let report = handle.join().await;
        self.finish(&report);
        Some(report)
    }

    /// Ask the running poll to stop; [`InsightsSession::wait`] then returns
    /// an aborted report.
    pub fn stop(&self) {
        if let Some(handle) = &self.poll {
            handle.stop();
        }
    }

    /// Stop switch for the running poll, if any.
    pub fn stopper(&self) -> Option<PollStopper> {
        self.poll.as_ref().map(PollHandle::stopper)
    }

    fn finish(&mut self, report: &PollReport) {
        self.results.absorb(&report.state);
        self.processing = false;
        self.status = report.outcome.message().to_string();
        info!("{}", self.status);
    }

    // ── Questions ────────────────────────────────────────────────────────

    /// Ask a question against the uploaded corpus.
    ///
    /// Blank input is rejected without a request. Any backend failure is
    /// absorbed into the fixed error answer, so this only returns `Err` for
    /// blank input.
    pub async fn ask(&mut self, question: &str) -> Result<&QaSession, InsightsError> {
        let question = question.trim();
        if question.is_empty() {
            self.status = InsightsError::EmptyQuestion.to_string();
            return Err(InsightsError::EmptyQuestion);
        }

        self.status = "Fetching answer...".to_string();
        self.qa = match self.backend.ask_question(question).await {
            Ok(answer) => QaSession {
                question: question.to_string(),
                answer: answer.answer,
                sources: answer.source,
            },
            Err(e) => {
                warn!("Error asking question: {}", e);
                QaSession::failed(question)
            }
        };
        self.status.clear();
        Ok(&self.qa)
    }
}
