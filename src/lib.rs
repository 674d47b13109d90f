//! # pdf-insights
//!
//! Client for a PDF insights backend: upload a batch of PDFs, poll for the
//! summaries, comparisons, top questions and table visualisations the backend
//! produces asynchronously, and ask questions against the uploaded corpus.
//!
//! ## Flow
//!
//! ```text
//! PDFs
//!  │
//!  ├─ 1. Batch    collect local files / URLs, check %PDF magic
//!  ├─ 2. Upload   one multipart POST to /run_pipeline/
//!  ├─ 3. Poll     every interval: 4 concurrent GETs, merge non-empty slots
//!  │              until all four arrive (Completed) or the tick cap (Exhausted)
//!  └─ 4. Ask      POST /ask-question/ → answer + sources
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_insights::{ClientConfig, InsightsSession, NoopObserver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://127.0.0.1:8000")
//!         .max_ticks(10)
//!         .build()?;
//!     let mut session = InsightsSession::new(config)?;
//!     session.add_input("report.pdf").await?;
//!     session.submit(Arc::new(NoopObserver)).await?;
//!
//!     if let Some(report) = session.wait().await {
//!         println!("{}", report.outcome.message());
//!     }
//!     let qa = session.ask("What are the key findings?").await?;
//!     println!("{}", qa.answer);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-insights` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod poll;
pub mod progress;
pub mod render;
pub mod session;
pub mod state;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{Backend, ResultSource};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{InsightsError, SlotError};
pub use model::{Answer, Comparisons, Slot, Summaries, SummaryRecord, TableVisuals, TopQuestions};
pub use poll::{PollHandle, PollOutcome, PollReport, PollSettings, PollStopper, Poller};
pub use progress::{NoopObserver, Observer, PollObserver};
pub use session::InsightsSession;
pub use state::{PollState, QaSession};
pub use upload::{UploadBatch, UploadFile};
