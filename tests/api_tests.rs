mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::mocks::MockStages;
use common::wait_terminal;
use scholarsynth::{
    AppState, SynthConfig,
    api::routes::{cors_layer, create_router},
    research::{Stage, Task, TaskId},
    types::{AppError, CreateReportResponse, HealthResponse, MessageResponse, StatusResponse, TaskListResponse},
};
use serde_json::{Value, json};
use scholarsynth::utils::toml_config::ServerConfig;
use std::sync::Arc;
use std::time::Duration;

fn test_server(stages: MockStages) -> (TestServer, AppState) {
    let state = AppState::new(SynthConfig::default(), Arc::new(stages));
    let app = create_router().with_state(state.clone());
    let server = TestServer::new(app).unwrap();
    (server, state)
}

async fn start_report(server: &TestServer, query: &str) -> TaskId {
    let response = server.post("/api/report").json(&json!({ "query": query })).await;
    response.assert_status_ok();
    let body: CreateReportResponse = response.json();
    assert_eq!(body.status, "started");
    assert_eq!(body.message, "Research workflow initiated");
    body.task_id
}

// ============= Health =============

#[tokio::test]
async fn test_health_endpoints() {
    let (server, _) = test_server(MockStages::new(&["q"]));

    for path in ["/", "/health"] {
        let response = server.get(path).await;
        response.assert_status_ok();
        let body: HealthResponse = response.json();
        assert_eq!(body.status, "online");
        assert_eq!(body.service, "ScholarSynth");
    }
}

// ============= CORS =============

fn cors_server(allowed_origins: &[&str]) -> TestServer {
    let server_config = ServerConfig {
        allowed_origins: allowed_origins.iter().map(|o| o.to_string()).collect(),
        ..ServerConfig::default()
    };
    let state = AppState::new(SynthConfig::default(), Arc::new(MockStages::new(&["q"])));
    let app = create_router()
        .with_state(state)
        .layer(cors_layer(&server_config).unwrap());
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_cors_explicit_origins_allow_credentials() {
    let server = cors_server(&["http://localhost:5173"]);

    let response = server
        .get("/health")
        .add_header("origin", "http://localhost:5173")
        .await;
    response.assert_status_ok();

    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
}

#[tokio::test]
async fn test_cors_without_origins_allows_any_without_credentials() {
    for origins in [&[][..], &["*"][..]] {
        let server = cors_server(origins);

        let response = server
            .get("/health")
            .add_header("origin", "http://elsewhere.test")
            .await;

        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert!(headers.get("access-control-allow-credentials").is_none());
    }
}

#[test]
fn test_cors_rejects_malformed_origin() {
    let server_config = ServerConfig {
        allowed_origins: vec!["http://bad\norigin".to_string()],
        ..ServerConfig::default()
    };
    assert!(matches!(cors_layer(&server_config), Err(AppError::Configuration(_))));
}

// ============= Report lifecycle =============

#[tokio::test]
async fn test_create_and_fetch_completed_report() {
    let (server, state) = test_server(MockStages::new(&["q1", "q2", "q3"]));

    let id = start_report(&server, "How do batteries age?").await;
    wait_terminal(&state.coordinator, &id).await;

    let status: StatusResponse = server
        .get(&format!("/api/report/{}/status", id))
        .await
        .json();
    assert_eq!(status.task_id, id);
    assert_eq!(status.status, Stage::Done);
    assert_eq!(status.progress_percentage, 100);
    assert_eq!(status.sub_questions_count, 3);
    assert_eq!(status.completed_questions, 3);
    assert_eq!(status.current_step, "Report complete");

    let response = server.get(&format!("/api/report/{}", id)).await;
    response.assert_status_ok();
    let raw: Value = response.json();
    assert_eq!(raw["task_id"], json!(id.as_str()));
    assert_eq!(raw["status"], json!("done"));

    let task: Task = response.json();
    let report = task.report.expect("report present");
    assert_eq!(report.title, "How do batteries age?");
    assert!(!report.citations.is_empty());
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let (server, _) = test_server(MockStages::new(&["q"]));

    let response = server.post("/api/report").json(&json!({ "query": "   " })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let (server, _) = test_server(MockStages::new(&["q"]));

    for path in [
        "/api/report/missing",
        "/api/report/missing/status",
        "/api/report/missing/stream",
    ] {
        server.get(path).await.assert_status(StatusCode::NOT_FOUND);
    }
    server
        .delete("/api/report/missing")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_task_reports_error() {
    let (server, state) = test_server(MockStages::new(&["q1", "q2"]).failing_research(&[0, 1]));

    let id = start_report(&server, "doomed").await;
    wait_terminal(&state.coordinator, &id).await;

    let task: Task = server.get(&format!("/api/report/{}", id)).await.json();
    assert_eq!(task.stage, Stage::Failed);
    assert_eq!(task.error.as_deref(), Some("all research tasks failed"));
    assert!(task.report.is_none());
}

#[tokio::test]
async fn test_delete_report() {
    let (server, state) = test_server(MockStages::new(&["q1"]).blocking_research());

    let id = start_report(&server, "short lived").await;

    let response = server.delete(&format!("/api/report/{}", id)).await;
    response.assert_status_ok();
    let body: MessageResponse = response.json();
    assert_eq!(body.message, "Task deleted successfully");

    server
        .get(&format!("/api/report/{}/status", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&format!("/api/report/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert!(state.coordinator.list().is_empty());
}

#[tokio::test]
async fn test_list_reports_in_creation_order() {
    let (server, state) = test_server(MockStages::new(&["q1"]));

    let first = start_report(&server, "first").await;
    let second = start_report(&server, "second").await;
    wait_terminal(&state.coordinator, &first).await;
    wait_terminal(&state.coordinator, &second).await;

    let list: TaskListResponse = server.get("/api/reports").await.json();
    assert_eq!(list.count, 2);
    assert_eq!(list.tasks[0].task_id, first);
    assert_eq!(list.tasks[0].query, "first");
    assert_eq!(list.tasks[1].task_id, second);
    assert!(list.tasks.iter().all(|t| t.has_report && t.progress_percentage == 100));
}

// ============= Streaming =============

fn sse_events(body: &str) -> Vec<(String, Value)> {
    let mut events = Vec::new();
    for block in body.split("\n\n") {
        let mut name = None;
        let mut data = None;
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                name = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data = serde_json::from_str(rest.trim()).ok();
            }
        }
        if let (Some(name), Some(data)) = (name, data) {
            events.push((name, data));
        }
    }
    events
}

#[tokio::test]
async fn test_stream_emits_progress_then_done() {
    let (server, _) = test_server(
        MockStages::new(&["q1", "q2", "q3"]).with_research_delay(Duration::from_millis(10)),
    );

    let id = start_report(&server, "streamed").await;
    let response = server.get(&format!("/api/report/{}/stream", id)).await;
    response.assert_status_ok();

    let events = sse_events(&response.text());
    let (last_name, last_data) = events.last().expect("at least one event");
    assert_eq!(last_name, "done");
    assert_eq!(last_data, &json!({ "status": "done", "done": true }));

    let progress: Vec<&Value> = events
        .iter()
        .filter(|(name, _)| name == "progress")
        .map(|(_, data)| data)
        .collect();
    assert!(!progress.is_empty());

    let percentages: Vec<u64> = progress
        .iter()
        .map(|p| p["progress_percentage"].as_u64().unwrap())
        .collect();
    assert!(percentages.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percentages.last(), Some(&100));

    // Consecutive progress events always differ in percentage or step
    for pair in progress.windows(2) {
        assert!(
            pair[0]["progress_percentage"] != pair[1]["progress_percentage"]
                || pair[0]["current_step"] != pair[1]["current_step"]
        );
    }
}

#[tokio::test]
async fn test_stream_of_finished_task_emits_final_state() {
    let (server, state) = test_server(MockStages::new(&[]).failing_plan("offline"));

    let id = start_report(&server, "already failed").await;
    wait_terminal(&state.coordinator, &id).await;

    let response = server.get(&format!("/api/report/{}/stream", id)).await;
    let events = sse_events(&response.text());

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, "progress");
    assert_eq!(events[0].1["status"], json!("failed"));
    assert_eq!(events[0].1["progress_percentage"], json!(10));
    assert_eq!(events[1], ("done".to_string(), json!({ "status": "failed", "done": true })));
}
