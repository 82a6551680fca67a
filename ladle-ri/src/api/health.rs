//! Health check endpoint

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// `GET /health`: service liveness plus uptime
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();
    Json(json!({
        "status": "ok",
        "service": "ladle-ri",
        "uptime_seconds": uptime,
    }))
}
