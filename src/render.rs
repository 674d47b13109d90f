//! Plain-text rendering of results for terminals and logs.
//!
//! Output is light Markdown so it reads well raw and pastes cleanly into a
//! document. Every section has a placeholder line when it has no data, so
//! the layout stays stable across poll ticks.

use crate::model::{Comparisons, Summaries, TableVisuals, TopQuestions};
use crate::state::{PollState, QaSession};
use std::fmt::Write;

/// Summaries: one heading per document, then its non-null fields.
pub fn render_summaries(summaries: Option<&Summaries>) -> String {
    let mut out = String::from("## Final Summaries\n\n");
    match summaries.filter(|s| !s.is_empty()) {
        None => out.push_str("No summaries available.\n"),
        Some(s) => {
            for (doc_id, record) in &s.0 {
                let title = record.title().unwrap_or_else(|| doc_id.clone());
                let _ = writeln!(out, "### {title}\n");
                for (key, value) in record.fields() {
                    let _ = writeln!(out, "**{key}:** {value}");
                }
                out.push('\n');
            }
        }
    }
    out
}

pub fn render_comparisons(comparisons: Option<&Comparisons>) -> String {
    let mut out = String::from("## Comparisons\n\n");
    match comparisons.filter(|c| !c.is_empty()) {
        None => out.push_str("No comparisons available.\n"),
        Some(c) => {
            for (key, value) in c.entries() {
                let _ = writeln!(out, "**{key}:** {value}");
            }
        }
    }
    out
}

/// Overall questions first, then per-document lists.
pub fn render_top_questions(questions: Option<&TopQuestions>) -> String {
    let mut out = String::from("## Top Questions\n\n");
    let Some(q) = questions.filter(|q| !q.is_empty()) else {
        out.push_str("No top questions available.\n");
        return out;
    };

    if !q.overall.is_empty() {
        out.push_str("### Overall Top Questions\n\n");
        for (i, question) in q.overall.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, question);
        }
        out.push('\n');
    }
    for (doc_id, list) in q.per_document.iter().filter(|(_, l)| !l.is_empty()) {
        let _ = writeln!(out, "### {doc_id}\n");
        for (i, question) in list.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, question);
        }
        out.push('\n');
    }
    out
}

/// Links are resolved against `base_url` so relative names are clickable.
pub fn render_table_visuals(visuals: Option<&TableVisuals>, base_url: &str) -> String {
    let mut out = String::from("## Table Visualizations\n\n");
    match visuals.filter(|v| !v.is_empty()) {
        None => out.push_str("No table visualizations available.\n"),
        Some(v) => {
            for (i, url) in v.resolve(base_url).iter().enumerate() {
                let _ = writeln!(out, "- View Visualization {}: {}", i + 1, url);
            }
        }
    }
    out
}

/// All four result sections.
pub fn render_results(state: &PollState, base_url: &str) -> String {
    [
        render_summaries(state.summaries.as_ref()),
        render_comparisons(state.comparisons.as_ref()),
        render_top_questions(state.top_questions.as_ref()),
        render_table_visuals(state.table_visuals.as_ref(), base_url),
    ]
    .join("\n")
}

/// Answer text, then the source list when there is one.
pub fn render_answer(qa: &QaSession) -> String {
    let mut out = String::new();
    if !qa.question.is_empty() {
        let _ = writeln!(out, "## Q: {}\n", qa.question);
    }
    if !qa.has_answer() {
        out.push_str("No answer found.\n");
        return out;
    }
    let _ = writeln!(out, "{}", qa.answer);
    if !qa.sources.is_empty() {
        out.push_str("\n**Sources:**\n");
        for source in &qa.sources {
            let _ = writeln!(out, "- {source}");
        }
    }
    out
}
