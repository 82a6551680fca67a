//! ladle-ri - Recipe Ingest Service
//!
//! Accepts user-submitted recipe documents (HTML), runs each one through a
//! multi-stage asynchronous import pipeline (clean → structure → parse →
//! connect source → attach images → detect duplicates → categorize → tag),
//! and reports granular per-stage progress to live clients over SSE.

pub mod api;
pub mod broadcast;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod similarity;
pub mod stages;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::broadcast::StatusBroadcaster;
use crate::queue::JobQueue;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Import job queue the workers consume from
    pub queue: Arc<dyn JobQueue>,
    /// Status broadcaster for SSE streaming
    pub broadcaster: StatusBroadcaster,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, queue: Arc<dyn JobQueue>, broadcaster: StatusBroadcaster) -> Self {
        Self {
            db,
            queue,
            broadcaster,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/import", post(api::submit_import))
        .route("/import/events", get(api::import_event_stream))
        .route("/health", get(api::health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
