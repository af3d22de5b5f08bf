use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use humanizer::{
    ErrorKind, HumanizationRequest, HumanizationWorkflow, HumanizeClient, HumanizerConfig,
    LedgerQueue, PlanContext, PollingScheduler, Purpose, SchedulerConfig, UsageLedger,
    WorkflowEvent,
};

fn config(server: &MockServer, max_attempts: u32) -> HumanizerConfig {
    HumanizerConfig {
        api_key: "integration-key".into(),
        base_url: server.uri(),
        poll_interval_ms: 10,
        max_attempts,
        ..HumanizerConfig::default()
    }
}

fn workflow(config: &HumanizerConfig) -> HumanizationWorkflow<HumanizeClient> {
    let client = Arc::new(HumanizeClient::new(config).unwrap());
    HumanizationWorkflow::new(client, PollingScheduler::new(SchedulerConfig::from(config)))
}

fn pro_plan() -> Option<PlanContext> {
    Some(PlanContext {
        character_limit: 15_000,
        credits_remaining: 3_750,
    })
}

async fn mount_submit(server: &MockServer, id: &str) {
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(header("apikey", "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
        .expect(1)
        .mount(server)
        .await;
}

fn failure_kind(events: &[WorkflowEvent]) -> ErrorKind {
    match events.last() {
        Some(WorkflowEvent::Failed(err)) => err.kind,
        other => panic!("expected a Failed event, got {other:?}"),
    }
}

#[tokio::test]
async fn humanizes_text_after_a_few_polls() {
    let server = MockServer::start().await;
    mount_submit(&server, "doc-9").await;
    Mock::given(method("POST"))
        .and(path("/document"))
        .and(body_json(json!({ "id": "doc-9" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "doc-9" })))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/document"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": "Hello world",
            "readability": "High School",
            "purpose": "Essay",
        })))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let text = "The research methodology demonstrates significant results. ".repeat(10);
    let request = HumanizationRequest::new(text.clone()).with_purpose(Purpose::Essay);
    let events: Vec<_> = workflow(&config(&server, 40)).run(request, pro_plan()).collect().await;

    let progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            WorkflowEvent::ProgressUpdate(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![10.0, 50.0, 51.0, 52.0, 53.0, 100.0]);

    let Some(WorkflowEvent::Completed(done)) = events.last() else {
        panic!("expected Completed, got {events:?}");
    };
    assert_eq!(done.result.output, "Hello world");
    assert_eq!(done.result.cost_credits, humanizer::estimate_cost(&text));
    assert_eq!(done.result.metadata.purpose, "Essay");

    let (queue, _) = LedgerQueue::spawn(UsageLedger::new(5_000, 1_250));
    let delta = done.ledger_delta.clone().unwrap();
    let ledger = queue.apply(delta).await.unwrap();
    assert_eq!(ledger.used_credits, 1_250 + done.result.cost_credits);
    assert_eq!(ledger.history[0].humanized, "Hello world");
}

#[tokio::test]
async fn insufficient_credits_on_submit_skips_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(
            ResponseTemplate::new(402).set_body_json(json!({ "error": "Not enough credits" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/document"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let events: Vec<_> = workflow(&config(&server, 40))
        .run(HumanizationRequest::new("a".repeat(600)), pro_plan())
        .collect()
        .await;

    assert_eq!(failure_kind(&events), ErrorKind::InsufficientCredits);
}

#[tokio::test]
async fn persistent_server_errors_fail_after_budget() {
    let server = MockServer::start().await;
    mount_submit(&server, "doc-5xx").await;
    Mock::given(method("POST"))
        .and(path("/document"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let events: Vec<_> = workflow(&config(&server, 3))
        .run(HumanizationRequest::new("a".repeat(600)), pro_plan())
        .collect()
        .await;

    assert_eq!(failure_kind(&events), ErrorKind::ServiceError);
}

#[tokio::test]
async fn never_ready_times_out_after_max_attempts() {
    let server = MockServer::start().await;
    mount_submit(&server, "doc-slow").await;
    Mock::given(method("POST"))
        .and(path("/document"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": "" })))
        .expect(5)
        .mount(&server)
        .await;

    let events: Vec<_> = workflow(&config(&server, 5))
        .run(HumanizationRequest::new("a".repeat(600)), None)
        .collect()
        .await;

    let Some(WorkflowEvent::Failed(err)) = events.last() else {
        panic!("expected Failed, got {events:?}");
    };
    assert_eq!(err.kind, ErrorKind::ProcessingTimeout);
    assert!(err.retryable);
}

#[tokio::test]
async fn bare_string_status_keeps_polling_until_timeout() {
    let server = MockServer::start().await;
    mount_submit(&server, "doc-busy").await;
    Mock::given(method("POST"))
        .and(path("/document"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("processing")))
        .expect(3)
        .mount(&server)
        .await;

    let events: Vec<_> = workflow(&config(&server, 3))
        .run(HumanizationRequest::new("a".repeat(600)), None)
        .collect()
        .await;

    assert_eq!(failure_kind(&events), ErrorKind::ProcessingTimeout);
}

#[tokio::test]
async fn short_text_never_reaches_the_service() {
    let server = MockServer::start().await;

    let events: Vec<_> = workflow(&config(&server, 40))
        .run(HumanizationRequest::new("too short"), pro_plan())
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    assert_eq!(failure_kind(&events), ErrorKind::InputTooShort);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_jobs_debit_one_ledger() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "doc-shared" })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/document"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": "rewritten" })))
        .mount(&server)
        .await;

    let workflow = workflow(&config(&server, 40));
    let (queue, _) = LedgerQueue::spawn(UsageLedger::new(5_000, 0));

    let first = workflow.run(HumanizationRequest::new("a".repeat(300)), pro_plan());
    let second = workflow.run(HumanizationRequest::new("b".repeat(700)), pro_plan());
    let (first, second) = tokio::join!(first.finish(|_| {}), second.finish(|_| {}));

    for done in [first.unwrap(), second.unwrap()] {
        queue.apply(done.ledger_delta.unwrap()).await.unwrap();
    }

    let ledger = queue.snapshot().await.unwrap();
    assert_eq!(ledger.used_credits, 30 + 70);
    assert_eq!(ledger.history.len(), 2);
    assert_eq!(ledger.remaining(), 4_900);
}
