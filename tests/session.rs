//! End-to-end session tests: upload → poll → ask against a wiremock backend.
//!
//! Poll intervals are a few milliseconds so each test finishes quickly in
//! real time.

use pdf_insights::{
    ClientConfig, InsightsError, InsightsSession, NoopObserver, PollObserver, PollOutcome, Slot,
    SlotError,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF: &[u8] = b"%PDF-1.5\n%test\n";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn session_for(server: &MockServer, max_ticks: u32) -> InsightsSession {
    init_tracing();
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .poll_interval(Duration::from_millis(20))
        .max_ticks(max_ticks)
        .request_timeout_secs(5)
        .build()
        .expect("valid config");
    InsightsSession::new(config).expect("session")
}

async fn mount_upload_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/run_pipeline/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "started"})))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_get(server: &MockServer, p: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn summaries() -> Value {
    json!({"doc_1": {"Title & Subject": "Annual report", "Key Findings": "Profit up"}})
}

fn comparisons() -> Value {
    json!({"doc_1 vs doc_2": "Both report growth"})
}

fn top_questions() -> Value {
    json!({
        "top_10_overall_questions": ["What grew?", "Why?"],
        "top_10_per_pdf_questions": {"doc_1": ["What grew?"]}
    })
}

fn table_visuals() -> Value {
    json!({"table_visuals": ["static/t1.html"]})
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl PollObserver for Recorder {
    fn on_slot_ready(&self, slot: Slot) {
        self.events.lock().unwrap().push(format!("ready {slot:?}"));
    }
    fn on_slot_error(&self, slot: Slot, error: &SlotError) {
        self.events
            .lock()
            .unwrap()
            .push(format!("error {slot:?} {error}"));
    }
}

#[tokio::test]
async fn submitting_zero_files_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_for(&server, 10);
    let err = session.submit(Arc::new(NoopObserver)).await.unwrap_err();
    assert!(matches!(err, InsightsError::NoFilesSelected));
    assert_eq!(session.status(), "No files selected.");
    assert!(!session.is_processing());
    assert!(session.wait().await.is_none());
}

#[tokio::test]
async fn completes_after_exactly_one_tick() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    mount_get(&server, "/get-final-summaries/", summaries()).await;
    mount_get(&server, "/get-comparisons/", comparisons()).await;
    mount_get(&server, "/get-top-questions/", top_questions()).await;
    mount_get(&server, "/get-table-visuals/", table_visuals()).await;

    let mut session = session_for(&server, 10);
    session.add_bytes("a.pdf", PDF.to_vec()).unwrap();
    session.add_bytes("b.pdf", PDF.to_vec()).unwrap();

    let ack = session.submit(Arc::new(NoopObserver)).await.unwrap();
    assert_eq!(ack, json!({"message": "started"}));
    assert!(session.is_processing());
    assert_eq!(session.status(), "Processing started. Fetching results...");

    let report = session.wait().await.expect("poll was running");
    assert_eq!(report.outcome, PollOutcome::Completed { ticks: 1 });
    assert_eq!(session.status(), "Processing complete!");
    assert!(!session.is_processing());
    assert!(session.results().is_complete());
    assert_eq!(session.suggested_questions(), vec!["What grew?", "Why?"]);

    let requests = server.received_requests().await.unwrap();
    let summary_gets = requests
        .iter()
        .filter(|r| r.url.path() == "/get-final-summaries/")
        .count();
    assert_eq!(summary_gets, 1);
}

#[tokio::test]
async fn missing_resource_stops_at_tick_cap_and_keeps_the_rest() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    mount_get(&server, "/get-final-summaries/", summaries()).await;
    mount_get(&server, "/get-top-questions/", top_questions()).await;
    mount_get(&server, "/get-table-visuals/", table_visuals()).await;
    Mock::given(method("GET"))
        .and(path("/get-comparisons/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    let mut session = session_for(&server, 3);
    session.add_bytes("a.pdf", PDF.to_vec()).unwrap();
    session.submit(Arc::new(NoopObserver)).await.unwrap();

    let report = session.wait().await.unwrap();
    assert_eq!(
        report.outcome,
        PollOutcome::Exhausted {
            ticks: 3,
            missing: vec![Slot::Comparisons]
        }
    );
    assert_eq!(
        session.status(),
        "Could not fetch all results. Please try again later."
    );
    let results = session.results();
    assert!(results.summaries.is_some());
    assert!(results.top_questions.is_some());
    assert!(results.table_visuals.is_some());
    assert!(results.comparisons.is_none());
}

#[tokio::test]
async fn empty_response_after_result_leaves_it_visible() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/get-final-summaries/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(summaries()))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_get(&server, "/get-final-summaries/", json!({})).await;
    mount_get(&server, "/get-comparisons/", json!(null)).await;
    mount_get(&server, "/get-top-questions/", json!({})).await;
    mount_get(&server, "/get-table-visuals/", json!({"table_visuals": []})).await;

    let mut session = session_for(&server, 3);
    session.add_bytes("a.pdf", PDF.to_vec()).unwrap();
    session.submit(Arc::new(NoopObserver)).await.unwrap();

    let report = session.wait().await.unwrap();
    assert_eq!(report.outcome.ticks(), 3);
    let kept = report.state.summaries.expect("first summaries kept");
    assert_eq!(kept.0["doc_1"].title().as_deref(), Some("Annual report"));
}

#[tokio::test]
async fn second_run_keeps_results_from_the_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run_pipeline/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "started"})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-comparisons/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(comparisons()))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_get(&server, "/get-comparisons/", json!({})).await;
    mount_get(&server, "/get-final-summaries/", summaries()).await;
    mount_get(&server, "/get-top-questions/", top_questions()).await;
    mount_get(&server, "/get-table-visuals/", table_visuals()).await;

    let mut session = session_for(&server, 2);
    session.add_bytes("a.pdf", PDF.to_vec()).unwrap();

    session.submit(Arc::new(NoopObserver)).await.unwrap();
    let first = session.wait().await.unwrap();
    assert_eq!(first.outcome, PollOutcome::Completed { ticks: 1 });

    session.submit(Arc::new(NoopObserver)).await.unwrap();
    assert!(
        session.results().comparisons.is_some(),
        "earlier comparisons visible while the new run polls"
    );
    let second = session.wait().await.unwrap();
    assert_eq!(
        second.outcome,
        PollOutcome::Exhausted {
            ticks: 2,
            missing: vec![Slot::Comparisons]
        }
    );

    let results = session.results();
    assert!(results.is_complete());
    let kept = results.comparisons.expect("first run's comparisons kept");
    assert_eq!(kept.0["doc_1 vs doc_2"], json!("Both report growth"));
}

#[tokio::test]
async fn failing_resource_is_isolated() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    mount_get(&server, "/get-final-summaries/", summaries()).await;
    mount_get(&server, "/get-comparisons/", comparisons()).await;
    mount_get(&server, "/get-table-visuals/", table_visuals()).await;
    Mock::given(method("GET"))
        .and(path("/get-top-questions/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let mut session = session_for(&server, 2);
    session.add_bytes("a.pdf", PDF.to_vec()).unwrap();
    session.submit(recorder.clone()).await.unwrap();

    let report = session.wait().await.unwrap();
    assert_eq!(
        report.outcome,
        PollOutcome::Exhausted {
            ticks: 2,
            missing: vec![Slot::TopQuestions]
        }
    );

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events
            .iter()
            .filter(|e| e.starts_with("error TopQuestions HTTP 500"))
            .count(),
        2,
        "events: {events:?}"
    );
    assert!(events.contains(&"ready Summaries".to_string()));
    assert!(events.contains(&"ready TableVisuals".to_string()));
}

#[tokio::test]
async fn upload_failure_reports_error_and_does_not_poll() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run_pipeline/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_for(&server, 3);
    session.add_bytes("a.pdf", PDF.to_vec()).unwrap();
    let err = session.submit(Arc::new(NoopObserver)).await.unwrap_err();
    assert!(matches!(err, InsightsError::Status { status: 500, .. }));
    assert_eq!(session.status(), "Error during processing.");
    assert!(!session.is_processing());
    assert!(session.wait().await.is_none());
}

#[tokio::test]
async fn second_submit_while_processing_is_rejected() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .poll_interval(Duration::from_secs(60))
        .max_ticks(5)
        .build()
        .unwrap();
    let mut session = InsightsSession::new(config).unwrap();
    session.add_bytes("a.pdf", PDF.to_vec()).unwrap();
    session.submit(Arc::new(NoopObserver)).await.unwrap();

    let err = session.submit(Arc::new(NoopObserver)).await.unwrap_err();
    assert!(matches!(err, InsightsError::AlreadyProcessing));

    session.stop();
    let report = session.wait().await.unwrap();
    assert_eq!(report.outcome, PollOutcome::Aborted { ticks: 0 });
    assert_eq!(session.status(), "Polling stopped.");
}

#[tokio::test]
async fn blank_question_never_calls_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask-question/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_for(&server, 1);
    let err = session.ask("   \t ").await.unwrap_err();
    assert!(matches!(err, InsightsError::EmptyQuestion));
    assert_eq!(session.status(), "Please enter a question.");
}

#[tokio::test]
async fn failing_question_yields_fixed_error_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask-question/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server, 1);
    let qa = session.ask("What is the revenue?").await.unwrap();
    assert_eq!(qa.answer, "Error fetching answer");
    assert!(qa.sources.is_empty());
    assert_eq!(qa.question, "What is the revenue?");
}

#[tokio::test]
async fn answer_replaces_previous_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask-question/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "USD 4.2M",
            "source": ["doc_1, page 3", "doc_2, page 1"]
        })))
        .mount(&server)
        .await;

    let mut session = session_for(&server, 1);
    session.ask("first?").await.unwrap();
    let qa = session.ask("  second?  ").await.unwrap().clone();
    assert_eq!(qa.question, "second?");
    assert_eq!(qa.answer, "USD 4.2M");
    assert_eq!(qa.sources.len(), 2);
    assert!(session.status().is_empty());
}
