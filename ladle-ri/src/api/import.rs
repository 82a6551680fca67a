//! Import submission endpoint

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::queue::ImportJob;
use crate::AppState;

/// Request body for `POST /import`
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// The recipe document as submitted
    pub html: String,
    /// Where the document came from
    pub source_url: Option<String>,
    /// Image references to attach
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Response body: the identifier progress events are keyed by
#[derive(Debug, Serialize)]
pub struct ImportAccepted {
    pub import_id: Uuid,
}

/// Accept a recipe document and enqueue it for the import pipeline
pub async fn submit_import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<(StatusCode, Json<ImportAccepted>)> {
    if request.html.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Document HTML must not be empty".to_string(),
        ));
    }

    let job = ImportJob::new(request.html, request.source_url, request.image_urls);
    let import_id = job.import_id;
    let source_url = job.source_url.clone();

    state
        .queue
        .push(job)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to enqueue import: {}", e)))?;

    state
        .broadcaster
        .import_received(import_id, source_url.as_deref());
    info!(import_id = %import_id, "Import accepted");

    Ok((StatusCode::ACCEPTED, Json(ImportAccepted { import_id })))
}
