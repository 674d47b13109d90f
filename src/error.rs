//! Error types for the pdf-insights library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`InsightsError`] — **Fatal for one operation**: the upload, question, or
//!   configuration step cannot proceed (no files selected, blank question,
//!   backend unreachable). Returned as `Err(InsightsError)` from the
//!   top-level session and backend calls.
//!
//! * [`SlotError`] — **Non-fatal**: one of the four result resources failed
//!   on one poll tick, but the other three and the poll timer carry on.
//!   Handed to [`crate::poll::PollObserver::on_slot_error`] rather than
//!   propagated, so a flaky endpoint never aborts a poll.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-insights library.
#[derive(Debug, Error)]
pub enum InsightsError {
    // ── Validation errors (no network call is made) ─────────────────────
    /// Submit was called with an empty upload batch.
    #[error("No files selected.")]
    NoFilesSelected,

    /// The question was empty or whitespace only.
    #[error("Please enter a question.")]
    EmptyQuestion,

    /// A pipeline run is already being polled for this session.
    #[error("A pipeline run is already in progress; wait for it or stop it first")]
    AlreadyProcessing,

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file (or download) was read, but is not a PDF.
    #[error("'{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: [u8; 4] },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The request never produced a response (DNS, connection refused, TLS…).
    #[error("Request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    /// The request timed out.
    #[error("Request to {endpoint} timed out after {secs}s")]
    Timeout { endpoint: String, secs: u64 },

    /// The backend answered with a non-success status.
    #[error("Backend returned HTTP {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("Could not decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InsightsError {
    /// True for errors raised before any network call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            InsightsError::NoFilesSelected
                | InsightsError::EmptyQuestion
                | InsightsError::AlreadyProcessing
        )
    }
}

/// A non-fatal error for one result resource on one poll tick.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SlotError {
    /// Transport failure (connection refused, timeout, …).
    #[error("request failed: {detail}")]
    Request { detail: String },

    /// Non-success HTTP status.
    #[error("HTTP {status}")]
    Status { status: u16 },

    /// Body could not be decoded into the expected payload.
    #[error("invalid payload: {detail}")]
    Decode { detail: String },
}

impl From<InsightsError> for SlotError {
    fn from(e: InsightsError) -> Self {
        match e {
            InsightsError::Status { status, .. } => SlotError::Status { status },
            InsightsError::Decode { reason, .. } => SlotError::Decode { detail: reason },
            other => SlotError::Request {
                detail: other.to_string(),
            },
        }
    }
}
