//! Check engine tests against in-process content, page and evaluation servers

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{json, Value};

use eval_checker::{CheckEngine, ContentClient, EvaluationApiClient, PageClient, Target};
use evaluation_api::{create_router, AppState, Storage};

const COMMIT: &str = "abc123def456";

const README: &str = "# Sum of Sales\n\n\
    A single page that loads a CSV of sales figures and shows the running total \
    for the whole file.\n\n## Usage\n\nOpen index.html in a browser.\n";

const GOOD_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta name="viewport" content="width=device-width, initial-scale=1"></head>
<body>
<div id="total"></div>
<script>document.getElementById("total").textContent = "0";</script>
</body>
</html>"#;

#[derive(Clone)]
struct RepoState {
    files: Arc<HashMap<String, String>>,
    forced_status: Option<StatusCode>,
}

async fn contents_handler(
    State(state): State<RepoState>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if let Some(status) = state.forced_status {
        return (status, Json(json!({ "message": "unavailable" })));
    }
    if query.get("ref").map(String::as_str) != Some(COMMIT) {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "No commit found" })));
    }
    match state.files.get(&path) {
        Some(text) => {
            // The real API wraps base64 at 60 columns
            let encoded = STANDARD.encode(text);
            let wrapped = encoded
                .as_bytes()
                .chunks(60)
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect::<Vec<_>>()
                .join("\n");
            (StatusCode::OK, Json(json!({ "encoding": "base64", "content": wrapped })))
        }
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))),
    }
}

async fn start_repo(files: &[(&str, &str)], forced_status: Option<StatusCode>) -> String {
    let state = RepoState {
        files: Arc::new(
            files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ),
        forced_status,
    };
    let app = Router::new()
        .route("/repos/{owner}/{repo}/contents/{path}", get(contents_handler))
        .with_state(state);
    serve(app).await
}

async fn start_page(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().route("/", get(move || async move { (status, body) }));
    let base = serve(app).await;
    format!("{base}/")
}

async fn start_evaluation_api(dir: &tempfile::TempDir, api_token: Option<&str>) -> String {
    let storage = Storage::open(dir.path(), false).await.unwrap();
    let app = create_router(AppState {
        storage,
        api_token: api_token.map(str::to_string),
    });
    serve(app).await
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn engine(content_url: &str, api_url: &str, api_token: Option<&str>) -> CheckEngine {
    let timeout = Duration::from_secs(5);
    CheckEngine::new(
        ContentClient::new(content_url, None, timeout).unwrap(),
        PageClient::new(timeout).unwrap(),
        EvaluationApiClient::new(api_url, api_token.map(str::to_string), timeout).unwrap(),
    )
}

fn target(pages_url: &str) -> Target {
    Target {
        email: "student@example.com".to_string(),
        task: "sum-of-sales-abc12".to_string(),
        round: 1,
        repo_url: "https://github.com/student/app-sum-of-sales-abc12".to_string(),
        commit_sha: COMMIT.to_string(),
        pages_url: pages_url.to_string(),
        deployment_id: None,
    }
}

async fn notify(api_url: &str, pages_url: &str, token: Option<&str>) -> usize {
    let mut request = reqwest::Client::new().post(format!("{api_url}/notify")).json(&json!({
        "email": "student@example.com",
        "task": "sum-of-sales-abc12",
        "round": 1,
        "nonce": "nonce-1",
        "repo_url": "https://github.com/student/app-sum-of-sales-abc12",
        "commit_sha": COMMIT,
        "pages_url": pages_url,
    }));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let body: Value = request.send().await.unwrap().json().await.unwrap();
    body["deployment_id"].as_u64().unwrap() as usize
}

async fn get_json(url: String) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

fn good_repo() -> Vec<(&'static str, &'static str)> {
    vec![("LICENSE", "MIT License\n\nCopyright (c) 2025 Student"), ("README.md", README)]
}

#[tokio::test]
async fn test_all_checks_pass_and_deployment_is_marked_evaluated() {
    let dir = tempfile::tempdir().unwrap();
    let api_url = start_evaluation_api(&dir, None).await;
    let repo_url = start_repo(&good_repo(), None).await;
    let page_url = start_page(StatusCode::OK, GOOD_PAGE).await;

    let deployment_id = notify(&api_url, &page_url, None).await;
    let engine = engine(&repo_url, &api_url, None);

    let report = engine.evaluate_all().await.unwrap();
    assert_eq!(report.evaluated, vec![deployment_id]);
    assert!(report.failed.is_empty());

    let evaluations = get_json(format!("{api_url}/evaluations")).await;
    let evaluations = evaluations["evaluations"].as_array().unwrap();
    assert_eq!(evaluations.len(), 7);
    for evaluation in evaluations {
        assert_eq!(evaluation["score"], 100.0, "{}", evaluation["check"]);
        assert_eq!(evaluation["deployment_id"], deployment_id);
        assert!(evaluation["logs"].as_str().unwrap().starts_with("Evaluated at "));
    }

    let deployments = get_json(format!("{api_url}/deployments")).await;
    assert_eq!(deployments["deployments"][0]["status"], "evaluated");

    // A second pass has nothing left to do
    let again = engine.evaluate_all().await.unwrap();
    assert!(again.evaluated.is_empty());
    assert_eq!(again.skipped, 1);
    let evaluations = get_json(format!("{api_url}/evaluations")).await;
    assert_eq!(evaluations["total"], 7);
}

#[tokio::test]
async fn test_missing_page_fails_dynamic_checks_only() {
    let dir = tempfile::tempdir().unwrap();
    let api_url = start_evaluation_api(&dir, None).await;
    let repo_url = start_repo(&good_repo(), None).await;
    let page_url = start_page(StatusCode::NOT_FOUND, GOOD_PAGE).await;

    let results = engine(&repo_url, &api_url, None)
        .run_checks(&target(&page_url))
        .await;

    let scores: Vec<(&str, f64)> = results.iter().map(|r| (r.check.as_str(), r.score)).collect();
    assert_eq!(
        scores,
        vec![
            ("MIT License", 100.0),
            ("Professional README", 100.0),
            ("Git Security", 100.0),
            ("Page Accessibility", 0.0),
            ("HTML Structure", 0.0),
            ("JavaScript Present", 0.0),
            ("Responsive Design", 0.0),
        ]
    );
    assert_eq!(results[3].reason, "Page returned HTTP 404");
    assert_eq!(results[4].reason, "Could not fetch page (HTTP 404)");
}

#[tokio::test]
async fn test_absent_files_fail_without_errors() {
    let dir = tempfile::tempdir().unwrap();
    let api_url = start_evaluation_api(&dir, None).await;
    let repo_url = start_repo(&[("LICENSE", "Apache License 2.0")], None).await;
    let page_url = start_page(StatusCode::OK, GOOD_PAGE).await;

    let results = engine(&repo_url, &api_url, None)
        .run_checks(&target(&page_url))
        .await;

    assert_eq!(results[0].reason, "LICENSE file exists but is not MIT");
    assert_eq!(results[1].reason, "README.md not found");
    assert_eq!(results.iter().filter(|r| r.passed()).count(), 5);
}

#[tokio::test]
async fn test_content_api_error_becomes_failed_result() {
    let dir = tempfile::tempdir().unwrap();
    let api_url = start_evaluation_api(&dir, None).await;
    let repo_url = start_repo(&[], Some(StatusCode::INTERNAL_SERVER_ERROR)).await;
    let page_url = start_page(StatusCode::OK, GOOD_PAGE).await;

    let results = engine(&repo_url, &api_url, None)
        .run_checks(&target(&page_url))
        .await;

    assert_eq!(results.len(), 7);
    assert_eq!(results[0].score, 0.0);
    assert!(results[0].reason.contains("content API returned HTTP 500"));
    assert_eq!(results[1].score, 0.0);
    assert!(results[3..].iter().all(|r| r.passed()));
}

#[tokio::test]
async fn test_unreachable_page_is_caught_per_check() {
    let dir = tempfile::tempdir().unwrap();
    let api_url = start_evaluation_api(&dir, None).await;
    let repo_url = start_repo(&good_repo(), None).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let results = engine(&repo_url, &api_url, None)
        .run_checks(&target(&closed))
        .await;

    assert_eq!(results.len(), 7);
    assert!(results[..3].iter().all(|r| r.passed()));
    for result in &results[3..] {
        assert_eq!(result.score, 0.0);
        assert!(result.reason.starts_with("Error running check: Network error"));
    }
}

#[tokio::test]
async fn test_rejected_submission_stops_and_leaves_deployment_received() {
    let dir = tempfile::tempdir().unwrap();
    let api_url = start_evaluation_api(&dir, Some("grader-token")).await;
    let repo_url = start_repo(&good_repo(), None).await;
    let page_url = start_page(StatusCode::OK, GOOD_PAGE).await;

    let deployment_id = notify(&api_url, &page_url, Some("grader-token")).await;

    let report = engine(&repo_url, &api_url, None).evaluate_all().await.unwrap();
    assert_eq!(report.failed, vec![deployment_id]);
    assert!(report.evaluated.is_empty());

    let evaluations = get_json(format!("{api_url}/evaluations")).await;
    assert_eq!(evaluations["total"], 0);
    let deployments = get_json(format!("{api_url}/deployments")).await;
    assert_eq!(deployments["deployments"][0]["status"], "received");

    // With the token the same deployment goes through
    let report = engine(&repo_url, &api_url, Some("grader-token"))
        .evaluate_all()
        .await
        .unwrap();
    assert_eq!(report.evaluated, vec![deployment_id]);
}

#[tokio::test]
async fn test_single_target_submission() {
    let dir = tempfile::tempdir().unwrap();
    let api_url = start_evaluation_api(&dir, None).await;
    let repo_url = start_repo(&good_repo(), None).await;
    let page_url = start_page(StatusCode::OK, "<html><body>bare</body></html>").await;

    let results = engine(&repo_url, &api_url, None)
        .evaluate(&target(&page_url))
        .await
        .unwrap();

    assert_eq!(results.len(), 7);
    assert_eq!(results[4].reason, "Missing tags: doctype, head_tag");
    assert!(!results[5].passed());
    assert!(!results[6].passed());

    let evaluations = get_json(format!("{api_url}/evaluations/student@example.com")).await;
    assert_eq!(evaluations["total"], 7);
    assert!(evaluations["evaluations"][0].get("deployment_id").is_none());
}

/// Evaluation API that accepts a fixed number of results, then fails
#[derive(Clone)]
struct FlakyApiState {
    pages_url: String,
    accept: usize,
    submitted: Arc<AtomicUsize>,
    marked: Arc<AtomicUsize>,
}

async fn flaky_deployments(State(state): State<FlakyApiState>) -> Json<Value> {
    Json(json!({
        "total": 1,
        "deployments": [{
            "id": 0,
            "timestamp": "2026-01-05T10:00:00Z",
            "email": "student@example.com",
            "task": "sum-of-sales-abc12",
            "round": 1,
            "nonce": "nonce-1",
            "repo_url": "https://github.com/student/app-sum-of-sales-abc12",
            "commit_sha": COMMIT,
            "pages_url": state.pages_url,
            "status": "received"
        }]
    }))
}

async fn flaky_evaluate(State(state): State<FlakyApiState>) -> (StatusCode, Json<Value>) {
    let n = state.submitted.fetch_add(1, Ordering::SeqCst);
    if n < state.accept {
        (StatusCode::OK, Json(json!({ "status": "ok", "evaluation_id": n + 1 })))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "disk full" })),
        )
    }
}

async fn flaky_mark(
    State(state): State<FlakyApiState>,
    Path(_id): Path<usize>,
) -> Json<Value> {
    state.marked.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "status": "ok", "deployment_id": 0, "changed": true }))
}

#[tokio::test]
async fn test_submission_stops_after_mid_battery_rejection() {
    let repo_url = start_repo(&good_repo(), None).await;
    let page_url = start_page(StatusCode::OK, GOOD_PAGE).await;

    let state = FlakyApiState {
        pages_url: page_url,
        accept: 3,
        submitted: Arc::new(AtomicUsize::new(0)),
        marked: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route("/deployments", get(flaky_deployments))
        .route("/evaluate", post(flaky_evaluate))
        .route("/deployments/evaluated/{id}", post(flaky_mark))
        .with_state(state.clone());
    let api_url = serve(app).await;

    let report = engine(&repo_url, &api_url, None).evaluate_all().await.unwrap();

    assert_eq!(report.failed, vec![0]);
    assert!(report.evaluated.is_empty());
    // Three accepted, the fourth rejected, the last three never sent
    assert_eq!(state.submitted.load(Ordering::SeqCst), 4);
    assert_eq!(state.marked.load(Ordering::SeqCst), 0);
}
