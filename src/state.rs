//! In-memory view state: the latest poll results and the Q&A session.
//!
//! Nothing here outlives the process. Each slot of [`PollState`] is replaced
//! wholesale, and only by a non-empty payload: an empty or failed fetch after
//! a good one leaves the good one in place. Slots are independent, so the
//! order in which a tick's four responses are merged never matters.

use crate::model::{Comparisons, Slot, Summaries, TableVisuals, TopQuestions};
use serde::{Deserialize, Serialize};

/// Fixed answer stored when a question could not be answered.
pub const ERROR_ANSWER: &str = "Error fetching answer";

/// Snapshot of the latest fetched results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollState {
    pub summaries: Option<Summaries>,
    pub comparisons: Option<Comparisons>,
    pub top_questions: Option<TopQuestions>,
    pub table_visuals: Option<TableVisuals>,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the summaries slot if `incoming` is non-empty.
    pub fn merge_summaries(&mut self, incoming: Summaries) -> bool {
        replace_if_non_empty(&mut self.summaries, incoming, Summaries::is_empty)
    }

    /// Replace the comparisons slot if `incoming` is non-empty.
    pub fn merge_comparisons(&mut self, incoming: Comparisons) -> bool {
        replace_if_non_empty(&mut self.comparisons, incoming, Comparisons::is_empty)
    }

    /// Replace the top-questions slot if `incoming` is non-empty.
    pub fn merge_top_questions(&mut self, incoming: TopQuestions) -> bool {
        replace_if_non_empty(&mut self.top_questions, incoming, TopQuestions::is_empty)
    }

    /// Replace the table-visuals slot if `incoming` is non-empty, keeping
    /// only the `limit` most recent entries.
    pub fn merge_table_visuals(&mut self, mut incoming: TableVisuals, limit: usize) -> bool {
        incoming.truncate_to_recent(limit);
        replace_if_non_empty(&mut self.table_visuals, incoming, TableVisuals::is_empty)
    }

    /// Take every populated slot of `other`, keeping ours where `other`
    /// has nothing. Returns whether anything changed.
    pub fn absorb(&mut self, other: &PollState) -> bool {
        let mut changed = false;
        changed |= overlay(&mut self.summaries, &other.summaries);
        changed |= overlay(&mut self.comparisons, &other.comparisons);
        changed |= overlay(&mut self.top_questions, &other.top_questions);
        changed |= overlay(&mut self.table_visuals, &other.table_visuals);
        changed
    }

    pub fn has(&self, slot: Slot) -> bool {
        match slot {
            Slot::Summaries => self.summaries.is_some(),
            Slot::Comparisons => self.comparisons.is_some(),
            Slot::TopQuestions => self.top_questions.is_some(),
            Slot::TableVisuals => self.table_visuals.is_some(),
        }
    }

    /// True once all four slots hold a result.
    pub fn is_complete(&self) -> bool {
        Slot::ALL.iter().all(|s| self.has(*s))
    }

    /// Slots that still have no result, in canonical order.
    pub fn missing(&self) -> Vec<Slot> {
        Slot::ALL.into_iter().filter(|s| !self.has(*s)).collect()
    }

    /// Slots that hold a result, in canonical order.
    pub fn ready(&self) -> Vec<Slot> {
        Slot::ALL.into_iter().filter(|s| self.has(*s)).collect()
    }

    /// Overall top questions, or an empty slice before they arrive.
    pub fn overall_questions(&self) -> &[String] {
        self.top_questions
            .as_ref()
            .map(|q| q.overall.as_slice())
            .unwrap_or(&[])
    }
}

fn replace_if_non_empty<T: PartialEq>(
    slot: &mut Option<T>,
    incoming: T,
    is_empty: impl Fn(&T) -> bool,
) -> bool {
    if is_empty(&incoming) {
        return false;
    }
    let changed = slot.as_ref() != Some(&incoming);
    *slot = Some(incoming);
    changed
}

fn overlay<T: Clone + PartialEq>(slot: &mut Option<T>, incoming: &Option<T>) -> bool {
    match incoming {
        Some(value) if slot.as_ref() != Some(value) => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// The most recent question, its answer and source citations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QaSession {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
}

impl QaSession {
    /// The session recorded when answering `question` failed.
    pub fn failed(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: ERROR_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }

    pub fn has_answer(&self) -> bool {
        !self.answer.is_empty()
    }

    pub fn is_error(&self) -> bool {
        self.answer == ERROR_ANSWER && self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SummaryRecord;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn summaries() -> Summaries {
        let mut rec = BTreeMap::new();
        rec.insert("Title & Subject".to_string(), json!("Doc"));
        let mut m = BTreeMap::new();
        m.insert("doc1".to_string(), SummaryRecord(rec));
        Summaries(m)
    }

    fn comparisons() -> Comparisons {
        let mut m = BTreeMap::new();
        m.insert("a vs b".to_string(), json!("similar"));
        Comparisons(m)
    }

    fn questions() -> TopQuestions {
        TopQuestions {
            overall: vec!["What is it?".into()],
            per_document: BTreeMap::new(),
        }
    }

    fn visuals(n: usize) -> TableVisuals {
        TableVisuals {
            table_visuals: (0..n).map(|i| format!("t{i}.png")).collect(),
        }
    }

    #[test]
    fn empty_payload_is_a_no_op() {
        let mut st = PollState::new();
        assert!(st.merge_comparisons(comparisons()));
        assert!(!st.merge_comparisons(Comparisons::default()));
        assert_eq!(st.comparisons, Some(comparisons()));
    }

    #[test]
    fn identical_payload_reports_unchanged() {
        let mut st = PollState::new();
        assert!(st.merge_summaries(summaries()));
        assert!(!st.merge_summaries(summaries()));
        assert!(st.summaries.is_some());
    }

    #[test]
    fn completion_requires_all_four() {
        let mut st = PollState::new();
        st.merge_summaries(summaries());
        st.merge_comparisons(comparisons());
        st.merge_top_questions(questions());
        assert!(!st.is_complete());
        assert_eq!(st.missing(), vec![Slot::TableVisuals]);
        st.merge_table_visuals(visuals(2), 10);
        assert!(st.is_complete());
        assert!(st.missing().is_empty());
        assert_eq!(st.ready().len(), 4);
    }

    #[test]
    fn merge_order_does_not_matter() {
        let mut a = PollState::new();
        a.merge_summaries(summaries());
        a.merge_table_visuals(visuals(3), 10);
        a.merge_comparisons(Comparisons::default());
        a.merge_top_questions(questions());

        let mut b = PollState::new();
        b.merge_top_questions(questions());
        b.merge_comparisons(Comparisons::default());
        b.merge_table_visuals(visuals(3), 10);
        b.merge_summaries(summaries());

        assert_eq!(a, b);
    }

    #[test]
    fn table_visuals_truncated_on_merge() {
        let mut st = PollState::new();
        st.merge_table_visuals(visuals(15), 10);
        let kept = &st.table_visuals.as_ref().unwrap().table_visuals;
        assert_eq!(kept.len(), 10);
        assert_eq!(kept.first().map(String::as_str), Some("t5.png"));
    }

    #[test]
    fn absorb_keeps_slots_the_newer_state_lacks() {
        let mut shown = PollState::new();
        shown.merge_comparisons(comparisons());
        shown.merge_summaries(summaries());

        let mut newer = PollState::new();
        newer.merge_top_questions(questions());
        assert!(shown.absorb(&newer));

        assert_eq!(shown.comparisons, Some(comparisons()));
        assert_eq!(shown.summaries, Some(summaries()));
        assert_eq!(shown.top_questions, Some(questions()));
        assert!(!shown.absorb(&newer));
        assert!(!shown.absorb(&PollState::new()));
    }

    #[test]
    fn overall_questions_default_empty() {
        let mut st = PollState::new();
        assert!(st.overall_questions().is_empty());
        st.merge_top_questions(questions());
        assert_eq!(st.overall_questions(), ["What is it?".to_string()]);
    }

    #[test]
    fn failed_qa_session() {
        let qa = QaSession::failed("why?");
        assert_eq!(qa.answer, "Error fetching answer");
        assert!(qa.sources.is_empty());
        assert!(qa.is_error());
        assert!(qa.has_answer());
    }
}
