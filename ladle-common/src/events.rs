//! Event types for the Ladle event system
//!
//! Provides shared event definitions and the EventBus used by all Ladle
//! services. Events are broadcast via EventBus and serialized for SSE
//! transmission to connected clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle status of one pipeline stage, as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    /// Stage started and is running
    Processing,
    /// Stage finished successfully
    Completed,
    /// Stage failed terminally (retries exhausted or non-retryable error)
    Failed,
}

/// Stable identifier for each import pipeline stage.
///
/// Used as the `context` field of status events so clients can match events
/// to stages without parsing human-readable messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageContext {
    CleanDocument,
    StructureDocument,
    ParseLines,
    ConnectSource,
    AttachImages,
    CheckDuplicates,
    Categorize,
    Tag,
}

impl StageContext {
    /// Context tag as transmitted over the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CleanDocument => "CLEAN_DOCUMENT",
            Self::StructureDocument => "STRUCTURE_DOCUMENT",
            Self::ParseLines => "PARSE_LINES",
            Self::ConnectSource => "CONNECT_SOURCE",
            Self::AttachImages => "ATTACH_IMAGES",
            Self::CheckDuplicates => "CHECK_DUPLICATES",
            Self::Categorize => "CATEGORIZE",
            Self::Tag => "TAG",
        }
    }
}

impl std::fmt::Display for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ladle event types
///
/// Shared across Ladle services; the ingest service (ladle-ri) emits the
/// import events, the UI service consumes them over SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LadleEvent {
    /// Import job accepted and queued
    ImportReceived {
        /// Import identifier assigned to the submitted document
        import_id: Uuid,
        /// Source URL supplied with the submission (if any)
        source_url: Option<String>,
        /// When the job was accepted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Per-stage progress update
    ///
    /// Emitted when a stage starts (PROCESSING), finishes (COMPLETED) or
    /// fails terminally (FAILED). The message/metadata vary by stage outcome,
    /// e.g. for duplicate checking: "Duplicate note identified!" with
    /// `{"duplicateCount": N}` vs "Verified no duplicates!" with
    /// `{"duplicateCount": 0}`.
    ImportStageStatus {
        /// Import identifier
        import_id: Uuid,
        /// PROCESSING / COMPLETED / FAILED
        status: ImportStatus,
        /// Human-readable progress message
        message: String,
        /// Stage identifier for routing/filtering
        context: StageContext,
        /// Note the stage operated on (None before note creation)
        note_id: Option<Uuid>,
        /// Stage-specific structured details
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
        /// When the status changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Import job completed: all stages finished
    ImportCompleted {
        /// Import identifier
        import_id: Uuid,
        /// Note created by this import
        note_id: Option<Uuid>,
        /// Total processing duration in milliseconds
        duration_ms: u64,
        /// When the job completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Import job failed terminally
    ImportFailed {
        /// Import identifier
        import_id: Uuid,
        /// Note created before the failure (if any)
        note_id: Option<Uuid>,
        /// Stage that failed
        stage: StageContext,
        /// Error message details
        error: String,
        /// When the job failed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl LadleEvent {
    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            LadleEvent::ImportReceived { .. } => "ImportReceived",
            LadleEvent::ImportStageStatus { .. } => "ImportStageStatus",
            LadleEvent::ImportCompleted { .. } => "ImportCompleted",
            LadleEvent::ImportFailed { .. } => "ImportFailed",
        }
    }
}

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LadleEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    ///
    /// Recommended values: 1000 for a running service, 10-100 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<LadleEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LadleEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<LadleEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    ///
    /// Status events are informational; the pipeline keeps running whether or
    /// not a client is connected.
    pub fn emit_lossy(&self, event: LadleEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_event(status: ImportStatus) -> LadleEvent {
        LadleEvent::ImportStageStatus {
            import_id: Uuid::new_v4(),
            status,
            message: "Checking for duplicate notes...".to_string(),
            context: StageContext::CheckDuplicates,
            note_id: Some(Uuid::new_v4()),
            metadata: None,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(10);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_eventbus_emit() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(stage_event(ImportStatus::Processing))
            .expect("emit should succeed");

        let received = rx.try_recv().expect("should receive event");
        assert_eq!(received.event_type(), "ImportStageStatus");
    }

    #[test]
    fn test_eventbus_emit_lossy_without_subscribers() {
        let bus = EventBus::new(2);
        // No subscribers; emit_lossy must not panic or error
        for _ in 0..10 {
            bus.emit_lossy(stage_event(ImportStatus::Completed));
        }
        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(stage_event(ImportStatus::Completed))
            .expect("emit should succeed");

        assert_eq!(
            rx1.try_recv().expect("rx1 should receive").event_type(),
            "ImportStageStatus"
        );
        assert_eq!(
            rx2.try_recv().expect("rx2 should receive").event_type(),
            "ImportStageStatus"
        );
    }

    #[test]
    fn test_stage_status_serialization_shape() {
        let import_id = Uuid::new_v4();
        let note_id = Uuid::new_v4();
        let event = LadleEvent::ImportStageStatus {
            import_id,
            status: ImportStatus::Completed,
            message: "Duplicate note identified!".to_string(),
            context: StageContext::CheckDuplicates,
            note_id: Some(note_id),
            metadata: Some(serde_json::json!({ "duplicateCount": 2 })),
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("serialization should succeed");
        assert!(json.contains("\"type\":\"ImportStageStatus\""));
        assert!(json.contains("\"status\":\"COMPLETED\""));
        assert!(json.contains("\"context\":\"CHECK_DUPLICATES\""));
        assert!(json.contains("\"duplicateCount\":2"));

        let back: LadleEvent = serde_json::from_str(&json).expect("round trip");
        match back {
            LadleEvent::ImportStageStatus { status, context, .. } => {
                assert_eq!(status, ImportStatus::Completed);
                assert_eq!(context, StageContext::CheckDuplicates);
            }
            _ => panic!("wrong event type deserialized"),
        }
    }

    #[test]
    fn test_metadata_omitted_when_none() {
        let json = serde_json::to_string(&stage_event(ImportStatus::Processing))
            .expect("serialization should succeed");
        assert!(!json.contains("metadata"));
    }

    #[test]
    fn test_stage_context_wire_tags() {
        assert_eq!(StageContext::CheckDuplicates.as_str(), "CHECK_DUPLICATES");
        assert_eq!(StageContext::CleanDocument.as_str(), "CLEAN_DOCUMENT");
        assert_eq!(StageContext::Tag.as_str(), "TAG");
        // as_str and serde agree on the wire form
        let json = serde_json::to_string(&StageContext::ConnectSource).unwrap();
        assert_eq!(json, "\"CONNECT_SOURCE\"");
    }
}
