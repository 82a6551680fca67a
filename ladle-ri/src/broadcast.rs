//! Status broadcasting for import progress
//!
//! Thin adapter between the pipeline and the [`EventBus`]: stamps timestamps,
//! shapes stage status events, and stays lossy. A missing SSE client never
//! affects pipeline progress.

use chrono::Utc;
use ladle_common::events::{EventBus, ImportStatus, LadleEvent, StageContext};
use uuid::Uuid;

use crate::pipeline::StageCompletion;

/// Broadcasts import lifecycle and per-stage status events
#[derive(Clone)]
pub struct StatusBroadcaster {
    bus: EventBus,
}

impl StatusBroadcaster {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Subscribe for SSE forwarding
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LadleEvent> {
        self.bus.subscribe()
    }

    pub fn import_received(&self, import_id: Uuid, source_url: Option<&str>) {
        self.bus.emit_lossy(LadleEvent::ImportReceived {
            import_id,
            source_url: source_url.map(|s| s.to_string()),
            timestamp: Utc::now(),
        });
    }

    /// Stage started: PROCESSING with the stage's fixed start message
    pub fn stage_started(
        &self,
        import_id: Uuid,
        context: StageContext,
        message: &str,
        note_id: Option<Uuid>,
    ) {
        self.bus.emit_lossy(LadleEvent::ImportStageStatus {
            import_id,
            status: ImportStatus::Processing,
            message: message.to_string(),
            context,
            note_id,
            metadata: None,
            timestamp: Utc::now(),
        });
    }

    /// Stage finished: COMPLETED with outcome-specific message and metadata
    pub fn stage_completed(
        &self,
        import_id: Uuid,
        context: StageContext,
        completion: &StageCompletion,
        note_id: Option<Uuid>,
    ) {
        self.bus.emit_lossy(LadleEvent::ImportStageStatus {
            import_id,
            status: ImportStatus::Completed,
            message: completion.message.clone(),
            context,
            note_id,
            metadata: completion.metadata.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Stage failed terminally (validation error or retries exhausted)
    pub fn stage_failed(
        &self,
        import_id: Uuid,
        context: StageContext,
        error: &str,
        note_id: Option<Uuid>,
    ) {
        self.bus.emit_lossy(LadleEvent::ImportStageStatus {
            import_id,
            status: ImportStatus::Failed,
            message: error.to_string(),
            context,
            note_id,
            metadata: None,
            timestamp: Utc::now(),
        });
    }

    pub fn import_completed(&self, import_id: Uuid, note_id: Option<Uuid>, duration_ms: u64) {
        self.bus.emit_lossy(LadleEvent::ImportCompleted {
            import_id,
            note_id,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    pub fn import_failed(
        &self,
        import_id: Uuid,
        note_id: Option<Uuid>,
        stage: StageContext,
        error: &str,
    ) {
        self.bus.emit_lossy(LadleEvent::ImportFailed {
            import_id,
            note_id,
            stage,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }
}
