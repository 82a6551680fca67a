//! HTTP surface tests against the router, no network

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use ladle_common::events::EventBus;
use ladle_ri::broadcast::StatusBroadcaster;
use ladle_ri::queue::{JobQueue, MemoryQueue};
use ladle_ri::{build_router, AppState};
use sqlx::SqlitePool;
use tower::util::ServiceExt;

async fn test_state() -> (AppState, Arc<MemoryQueue>) {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    ladle_common::db::create_tables(&pool).await.unwrap();
    let queue = Arc::new(MemoryQueue::new(16));
    let broadcaster = StatusBroadcaster::new(EventBus::new(64));
    (
        AppState::new(pool, queue.clone(), broadcaster),
        queue,
    )
}

#[tokio::test]
async fn test_health_endpoint() {
    let (state, _queue) = test_state().await;
    let app = build_router(state);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "ladle-ri");
}

#[tokio::test]
async fn test_submit_import_enqueues_job() {
    let (state, queue) = test_state().await;
    let app = build_router(state);

    let request = Request::post("/import")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "html": "<h1>Vanilla Cake</h1>",
                "source_url": "https://example.com/cake",
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let import_id = json["import_id"].as_str().expect("import id returned");

    let job = queue.pop().await.expect("job enqueued");
    assert_eq!(job.import_id.to_string(), import_id);
    assert_eq!(job.html, "<h1>Vanilla Cake</h1>");
    assert_eq!(job.source_url.as_deref(), Some("https://example.com/cake"));
}

#[tokio::test]
async fn test_submit_import_rejects_empty_html() {
    let (state, _queue) = test_state().await;
    let app = build_router(state);

    let request = Request::post("/import")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "html": "   " }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}
