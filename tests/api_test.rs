use std::{sync::Arc, time::Duration};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use tomato_timer::{
    api::create_router,
    state::{AppState, SlackSettings, TimerManager, TimerStore},
    tasks::completion_log_task,
};

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        TimerManager::new(),
        SlackSettings {
            token: Some("verify-me".to_string()),
            command: "/tomato".to_string(),
        },
        20553,
        "127.0.0.1".to_string(),
    ))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn slash(app: &Router, token: &str, command: &str, user: &str, text: &str) -> (StatusCode, Value) {
    let form = format!(
        "token={}&team_id=T1&user_id={}&user_name=tester&command={}&text={}",
        token,
        user,
        command.replace('/', "%2F"),
        text.replace(' ', "+")
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/slack/command")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test(start_paused = true)]
async fn timer_lifecycle_over_json_api() {
    let app = create_router(test_state());

    let (status, body) = send(&app, Method::POST, "/timers", Some(json!({"id": "alice", "minutes": 25}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "alice");
    assert_eq!(body["state"], "running");
    assert_eq!(body["remaining_seconds"], 25 * 60);

    let (status, body) = send(&app, Method::POST, "/timers/alice/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "paused");

    let (status, body) = send(&app, Method::POST, "/timers/alice/pause", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_state");

    let (status, body) = send(&app, Method::POST, "/timers/alice/resume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "running");

    let (status, body) = send(&app, Method::GET, "/timers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ids"], json!(["alice"]));

    let (status, _) = send(&app, Method::DELETE, "/timers/alice", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::DELETE, "/timers/alice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test(start_paused = true)]
async fn blank_ids_are_bad_requests() {
    let app = create_router(test_state());
    let (status, body) = send(&app, Method::POST, "/timers/%20/pause", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_argument");
}

#[tokio::test(start_paused = true)]
async fn generated_ids_and_completion_counting() {
    let state = test_state();
    let app = create_router(Arc::clone(&state));
    tokio::spawn(completion_log_task(Arc::clone(&state)));
    tokio::task::yield_now().await;

    let (status, body) = send(&app, Method::POST, "/timers", Some(json!({"seconds": 2}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    tokio::time::sleep(Duration::from_secs(3)).await;

    let (status, _) = send(&app, Method::GET, &format!("/timers/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(body["active_timers"], 0);
    assert_eq!(body["completed_timers"], 1);
    assert_eq!(body["last_action"], "start");
}

#[tokio::test(start_paused = true)]
async fn slack_commands_drive_the_callers_timer() {
    let state = test_state();
    let app = create_router(Arc::clone(&state));

    let (status, body) = slash(&app, "verify-me", "/tomato", "U42", "start 10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response_type"], "ephemeral");
    assert!(body["text"].as_str().unwrap().contains("10 minute"));
    assert_eq!(state.timers.status("U42").unwrap().remaining.num_minutes(), 10);

    let (_, body) = slash(&app, "verify-me", "/tomato", "U42", "pause").await;
    assert!(body["text"].as_str().unwrap().contains("paused"));

    let (_, body) = slash(&app, "verify-me", "/tomato", "U42", "resume").await;
    assert!(body["text"].as_str().unwrap().contains("running"));

    let (_, body) = slash(&app, "verify-me", "/tomato", "U42", "stop").await;
    assert_eq!(body["text"], "Pomodoro stopped.");

    let (_, body) = slash(&app, "verify-me", "/tomato", "U42", "status").await;
    assert!(body["text"].as_str().unwrap().contains("start"));
    assert!(state.timers.store().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slack_rejects_bad_tokens_and_foreign_commands() {
    let app = create_router(test_state());

    let (status, _) = slash(&app, "wrong", "/tomato", "U42", "start").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = slash(&app, "verify-me", "/coffee", "U42", "start").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = slash(&app, "verify-me", "/tomato", "U42", "juggle").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["text"].as_str().unwrap().starts_with("Usage"));
}

#[tokio::test]
async fn health_reports_ok() {
    let app = create_router(test_state());
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
