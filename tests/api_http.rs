// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot against the
// sample corpus under data/.
//
// Covered:
// - GET /health
// - POST /sessions, GET /sessions/{id}, DELETE /sessions/{id}
// - POST /sessions/{id}/turns
// - GET /movies/search
// - session capacity (503)

use std::sync::Arc;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use moviebot::ai::DisabledClient;
use moviebot::config::BotConfig;
use moviebot::{build_state, create_router};

const BODY_LIMIT: usize = 1024 * 1024;

fn router_with_capacity(max_sessions: usize) -> Router {
    let mut cfg = BotConfig::default();
    cfg.server.max_sessions = max_sessions;
    let state = build_state(&cfg, Arc::new(DisabledClient)).expect("sample corpus loads");
    create_router(state)
}

fn test_router() -> Router {
    router_with_capacity(100)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Json>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Json>) -> (StatusCode, Json) {
    let (status, bytes) = send(app, method, uri, body).await;
    let v = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, v)
}

async fn new_session(app: &Router) -> u64 {
    let (status, v) = send_json(app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(v["mode"], "collecting");
    v["session_id"].as_u64().expect("session_id")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();
    let (status, bytes) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "OK");
}

#[tokio::test]
async fn api_turn_reports_tag_and_payload() {
    let app = test_router();
    let id = new_session(&app).await;
    let uri = format!("/sessions/{id}/turns");

    let (status, v) = send_json(
        &app,
        "POST",
        &uri,
        Some(json!({ "text": "I loved \"The Matrix\"" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["tag"], "positive");
    assert_eq!(v["outcome"]["kind"], "rated");
    assert_eq!(v["outcome"]["index"], 9);
    assert_eq!(v["outcome"]["follow_up"]["kind"], "keep_rating");
    assert_eq!(v["outcome"]["follow_up"]["remaining"], 4);
    assert_eq!(v["num_rated"], 1);
    assert_eq!(v["mode"], "collecting");

    let (_, v) = send_json(&app, "POST", &uri, Some(json!({ "text": "I liked \"Titanic\"" }))).await;
    assert_eq!(v["tag"], "multi-match");
    assert_eq!(v["outcome"]["indices"], json!([7, 8]));

    let (_, v) = send_json(&app, "POST", &uri, Some(json!({ "text": "I liked \"Titanic" }))).await;
    assert_eq!(v["tag"], "unmatched-quote");
}

#[tokio::test]
async fn api_session_reaches_recommending_and_snapshot_reflects_it() {
    let app = test_router();
    let id = new_session(&app).await;
    let uri = format!("/sessions/{id}/turns");

    let lines = [
        "I loved \"Toy Story\"",
        "I hated \"Jumanji\"",
        "I enjoyed \"Heat\"",
        "I really liked \"The Usual Suspects\"",
        "\"Braveheart\" was awful",
    ];
    let mut last = Json::Null;
    for line in lines {
        let (status, v) = send_json(&app, "POST", &uri, Some(json!({ "text": line }))).await;
        assert_eq!(status, StatusCode::OK);
        last = v;
    }
    assert_eq!(last["mode"], "recommending");
    assert_eq!(last["outcome"]["follow_up"]["kind"], "recommend");

    let (status, snap) = send_json(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snap["num_rated"], 5);
    assert_eq!(snap["rated"].as_array().map(Vec::len), Some(5));
    assert_eq!(snap["cursor"], 1);

    let (_, v) = send_json(&app, "POST", &uri, Some(json!({ "text": "yes please" }))).await;
    assert!(v["tag"].as_str().unwrap_or_default().starts_with("recommend:"));

    let (_, v) = send_json(&app, "POST", &uri, Some(json!({ "text": "no thanks" }))).await;
    assert_eq!(v["tag"], "declined");
    assert_eq!(v["mode"], "recommending");

    // declining leaves the list in place; the next yes continues it
    let (_, v) = send_json(&app, "POST", &uri, Some(json!({ "text": "ok" }))).await;
    assert!(v["tag"].as_str().unwrap_or_default().starts_with("recommend:"));
    let (_, snap) = send_json(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(snap["cursor"], 3);
}

#[tokio::test]
async fn api_unknown_and_deleted_sessions_are_404() {
    let app = test_router();
    let (status, v) = send_json(&app, "GET", "/sessions/999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(v.get("error").is_some());

    let id = new_session(&app).await;
    let (status, _) = send(&app, "DELETE", &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/sessions/{id}/turns"),
        Some(json!({ "text": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_oversized_turn_is_rejected() {
    let app = test_router();
    let id = new_session(&app).await;
    let text = "a".repeat(5000);
    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/sessions/{id}/turns"),
        Some(json!({ "text": text })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_session_capacity_returns_503() {
    let app = router_with_capacity(1);
    new_session(&app).await;
    let (status, v) = send_json(&app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(v["error"].as_str().unwrap_or_default().contains("limit"));
}

#[tokio::test]
async fn api_movie_search() {
    let app = test_router();

    let (status, v) = send_json(&app, "GET", "/movies/search?title=Titanic", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["matches"].as_array().map(Vec::len), Some(2));

    let (_, v) = send_json(&app, "GET", "/movies/search?title=Titanic%20(1997)", None).await;
    assert_eq!(v["matches"][0]["index"], 8);
    assert_eq!(v["matches"][0]["genres"], json!(["Drama", "Romance"]));

    let (_, v) = send_json(
        &app,
        "GET",
        "/movies/search?title=The%20City%20of%20Lost%20Children",
        None,
    )
    .await;
    assert_eq!(v["matches"][0]["index"], 3);

    let (status, _) = send_json(&app, "GET", "/movies/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
