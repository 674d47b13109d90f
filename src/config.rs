//! Configuration for talking to the insights backend.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. The poll interval, tick cap and endpoint base live
//! in this one struct so every component (upload, poller, question answering)
//! reads the same settings.
//!
//! # The tick cap is required
//! Polling has no natural end if the backend never produces one of the four
//! results. [`ClientConfigBuilder::build`] refuses to produce a config until
//! `max_ticks` has been set explicitly.

use crate::error::InsightsError;
use crate::poll::PollSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable consulted for the default backend base URL.
pub const BASE_URL_ENV: &str = "PDF_INSIGHTS_BASE_URL";

/// Backend used when neither the builder nor the environment names one.
pub const DEFAULT_BASE_URL: &str = "https://extreme-rag-backend.onrender.com";

/// Configuration for an insights client.
///
/// # Example
/// ```rust
/// use pdf_insights::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .base_url("http://127.0.0.1:8000")
///     .poll_interval(Duration::from_secs(3))
///     .max_ticks(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "http://127.0.0.1:8000");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub base_url: String,

    /// Delay between poll ticks. Default: 5 s.
    ///
    /// The first tick fires one interval after the upload succeeds; the
    /// backend never has results ready sooner than that.
    pub poll_interval: Duration,

    /// Maximum number of poll ticks before giving up.
    pub max_ticks: u32,

    /// Number of most recent table visualisations to keep. Default: 10.
    pub table_visuals_limit: usize,

    /// Timeout for each GET and for question answering, in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Timeout for the multipart upload in seconds. Default: 600.
    ///
    /// The pipeline endpoint accepts the whole batch in one request, so a
    /// handful of large PDFs on a slow uplink needs far longer than a GET.
    pub upload_timeout_secs: u64,

    /// Timeout for downloading URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            base_url: None,
            poll_interval: Duration::from_secs(5),
            max_ticks: None,
            table_visuals_limit: 10,
            request_timeout_secs: 60,
            upload_timeout_secs: 600,
            download_timeout_secs: 120,
        }
    }

    /// The polling parameters derived from this config.
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.poll_interval,
            max_ticks: self.max_ticks,
            table_visuals_limit: self.table_visuals_limit,
        }
    }

    /// Absolute URL of `path` on the configured backend.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    poll_interval: Duration,
    max_ticks: Option<u32>,
    table_visuals_limit: usize,
    request_timeout_secs: u64,
    upload_timeout_secs: u64,
    download_timeout_secs: u64,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn max_ticks(mut self, n: u32) -> Self {
        self.max_ticks = Some(n);
        self
    }

    pub fn table_visuals_limit(mut self, n: usize) -> Self {
        self.table_visuals_limit = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.upload_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Without an explicit base URL the `PDF_INSIGHTS_BASE_URL` environment
    /// variable is used, then [`DEFAULT_BASE_URL`].
    pub fn build(self) -> Result<ClientConfig, InsightsError> {
        let max_ticks = self.max_ticks.ok_or_else(|| {
            InsightsError::InvalidConfig("max_ticks must be set explicitly".into())
        })?;
        if max_ticks == 0 {
            return Err(InsightsError::InvalidConfig("max_ticks must be ≥ 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(InsightsError::InvalidConfig(
                "poll_interval must be greater than zero".into(),
            ));
        }
        if self.request_timeout_secs == 0
            || self.upload_timeout_secs == 0
            || self.download_timeout_secs == 0
        {
            return Err(InsightsError::InvalidConfig(
                "request, upload and download timeouts must be greater than zero".into(),
            ));
        }

        let raw = match self.base_url {
            Some(url) => url,
            None => std::env::var(BASE_URL_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = normalise_base_url(&raw)?;

        Ok(ClientConfig {
            base_url,
            poll_interval: self.poll_interval,
            max_ticks,
            table_visuals_limit: self.table_visuals_limit,
            request_timeout_secs: self.request_timeout_secs,
            upload_timeout_secs: self.upload_timeout_secs,
            download_timeout_secs: self.download_timeout_secs,
        })
    }
}

/// Trim whitespace and trailing slashes; require an http(s) URL.
fn normalise_base_url(raw: &str) -> Result<String, InsightsError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|e| InsightsError::InvalidConfig(format!("base URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(InsightsError::InvalidConfig(format!(
            "base URL '{raw}' must use http or https, not '{other}'"
        ))),
    }
}
