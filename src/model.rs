//! Wire payloads exchanged with the insights backend.
//!
//! The backend is loosely typed: summary records are flat JSON objects whose
//! field set varies per document, and any endpoint may answer `null` before
//! its results exist. Payloads therefore keep raw [`serde_json::Value`]s where
//! the shape is open, and every slot type knows when it is "empty" so the
//! poller can tell "not ready yet" apart from a real result.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field of a summary record carrying the document's title line.
pub const TITLE_FIELD: &str = "Title & Subject";

/// Render a JSON value as display text: strings unquoted, everything else as JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One of the four independently fetched result categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Summaries,
    Comparisons,
    TopQuestions,
    TableVisuals,
}

impl Slot {
    /// All slots in canonical order.
    pub const ALL: [Slot; 4] = [
        Slot::Summaries,
        Slot::Comparisons,
        Slot::TopQuestions,
        Slot::TableVisuals,
    ];

    /// Backend path serving this slot.
    pub fn path(self) -> &'static str {
        match self {
            Slot::Summaries => "/get-final-summaries/",
            Slot::Comparisons => "/get-comparisons/",
            Slot::TopQuestions => "/get-top-questions/",
            Slot::TableVisuals => "/get-table-visuals/",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Slot::Summaries => "final summaries",
            Slot::Comparisons => "comparisons",
            Slot::TopQuestions => "top questions",
            Slot::TableVisuals => "table visualizations",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Summaries ────────────────────────────────────────────────────────────

/// A flat key-value summary of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryRecord(pub BTreeMap<String, Value>);

impl SummaryRecord {
    /// The `"Title & Subject"` field, if present and not null.
    pub fn title(&self) -> Option<String> {
        self.0
            .get(TITLE_FIELD)
            .filter(|v| !v.is_null())
            .map(value_text)
    }

    /// Every other non-null field in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, String)> {
        self.0
            .iter()
            .filter(|(k, v)| k.as_str() != TITLE_FIELD && !v.is_null())
            .map(|(k, v)| (k.as_str(), value_text(v)))
    }
}

/// Document id → summary record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summaries(pub BTreeMap<String, SummaryRecord>);

impl Summaries {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ── Comparisons ──────────────────────────────────────────────────────────

/// Comparison key → comparison text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Comparisons(pub BTreeMap<String, Value>);

impl Comparisons {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries as display text in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, String)> {
        self.0.iter().map(|(k, v)| (k.as_str(), value_text(v)))
    }
}

// ── Top questions ────────────────────────────────────────────────────────

/// Suggested questions across the corpus and per document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopQuestions {
    #[serde(rename = "top_10_overall_questions", default)]
    pub overall: Vec<String>,

    #[serde(rename = "top_10_per_pdf_questions", default)]
    pub per_document: BTreeMap<String, Vec<String>>,
}

impl TopQuestions {
    pub fn is_empty(&self) -> bool {
        self.overall.is_empty() && self.per_document.values().all(Vec::is_empty)
    }
}

// ── Table visuals ────────────────────────────────────────────────────────

/// References to rendered table visualisations (URLs or file names).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableVisuals {
    #[serde(default)]
    pub table_visuals: Vec<String>,
}

impl TableVisuals {
    pub fn is_empty(&self) -> bool {
        self.table_visuals.is_empty()
    }

    /// Keep only the `limit` most recent entries.
    pub fn truncate_to_recent(&mut self, limit: usize) {
        let len = self.table_visuals.len();
        if len > limit {
            self.table_visuals.drain(..len - limit);
        }
    }

    /// Absolute URLs: relative names are resolved against `base_url`.
    pub fn resolve(&self, base_url: &str) -> Vec<String> {
        let base = base_url.trim_end_matches('/');
        self.table_visuals
            .iter()
            .map(|v| {
                if v.starts_with("http://") || v.starts_with("https://") {
                    v.clone()
                } else {
                    format!("{}/{}", base, v.trim_start_matches('/'))
                }
            })
            .collect()
    }
}

// ── Question answering ───────────────────────────────────────────────────

/// Request body for `/ask-question/`.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionRequest<'a> {
    pub question: &'a str,
}

/// Response body from `/ask-question/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub answer: String,

    #[serde(default)]
    pub source: Vec<String>,
}
