//! Import pipeline contracts
//!
//! Every pipeline stage implements [`ImportAction`]: a pure synchronous
//! `validate_input` plus an async `execute` that receives injected
//! collaborators. The [`runner::StageRunner`] sequences stages for one job and
//! owns retry, status events and failure handling, so stage bodies contain
//! only their own business logic.

pub mod runner;
pub mod worker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ladle_common::events::StageContext;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::broadcast::StatusBroadcaster;
use crate::queue::ImportJob;
use crate::store::NoteStore;

/// One text block extracted from the submitted document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Paragraph,
    ListItem,
}

/// Output of the clean stage: title candidate plus visible text blocks
#[derive(Debug, Clone, Default)]
pub struct CleanedDocument {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

/// Output of the structure stage: raw section lines awaiting parsing
#[derive(Debug, Clone, Default)]
pub struct DocumentSections {
    pub ingredient_lines: Vec<String>,
    pub instruction_lines: Vec<String>,
}

/// The unit of data threaded through all stages for one job.
///
/// Owned by the runner for the lifetime of the job; each stage receives the
/// current version and returns the evolved one. Fields are declared per
/// stage's needs instead of accumulating dynamically.
#[derive(Debug, Clone)]
pub struct ImportPayload {
    pub import_id: Uuid,
    /// Raw submitted HTML (consumed by the clean stage)
    pub html: Option<String>,
    pub source_url: Option<String>,
    pub image_urls: Vec<String>,
    /// Set by the structure stage once the note record exists
    pub note_id: Option<Uuid>,
    /// Set by the clean stage
    pub document: Option<CleanedDocument>,
    /// Set by the structure stage
    pub sections: Option<DocumentSections>,
}

impl ImportPayload {
    pub fn from_job(job: &ImportJob) -> Self {
        Self {
            import_id: job.import_id,
            html: Some(job.html.clone()),
            source_url: job.source_url.clone(),
            image_urls: job.image_urls.clone(),
            note_id: None,
            document: None,
            sections: None,
        }
    }
}

/// Per-invocation metadata, supplied fresh by the runner each attempt.
/// Read-only to the action.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub job_id: Uuid,
    pub queue: &'static str,
    /// 1-based attempt number
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
}

/// Typed stage error taxonomy.
///
/// The runner pattern-matches on the variant to choose between failing fast
/// and retrying; stages never encode the distinction in message text.
#[derive(Debug, Error)]
pub enum StageError {
    /// Input payload is unusable; fails the attempt immediately, is never
    /// retried and never reaches `execute`
    #[error("{0}")]
    Validation(String),

    /// A referenced record does not exist; a data-integrity fault, not a
    /// transient condition
    #[error("{0}")]
    NotFound(String),

    /// Store/broadcast I/O failure; eligible for the runner's retry policy
    #[error(transparent)]
    Store(#[from] ladle_common::Error),
}

impl StageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StageError::Store(_))
    }
}

/// What a finished stage reports: the COMPLETED event's message and
/// stage-specific metadata
#[derive(Debug, Clone)]
pub struct StageCompletion {
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}

impl StageCompletion {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(message: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            message: message.into(),
            metadata: Some(metadata),
        }
    }
}

/// Evolved payload plus completion report returned by a successful `execute`
#[derive(Debug)]
pub struct StageOutput {
    pub payload: ImportPayload,
    pub completion: StageCompletion,
}

/// Collaborators injected into every stage execution.
///
/// Constructed once at startup and shared; no stage reaches into global state.
#[derive(Clone)]
pub struct StageDeps {
    pub store: Arc<dyn NoteStore>,
    pub broadcaster: Option<StatusBroadcaster>,
}

/// The uniform contract every pipeline stage implements
#[async_trait]
pub trait ImportAction: Send + Sync {
    /// Fixed identifier used for routing and logging
    fn name(&self) -> &'static str;

    /// Stage tag carried in status events
    fn context(&self) -> StageContext;

    /// Message for the PROCESSING start event
    fn start_message(&self) -> &'static str;

    /// Pure, synchronous input validation; no side effects
    fn validate_input(&self, payload: &ImportPayload) -> Result<(), StageError>;

    /// The stage's actual work. Collaborators arrive via `deps`, per-attempt
    /// metadata via `ctx`.
    async fn execute(
        &self,
        payload: ImportPayload,
        deps: &StageDeps,
        ctx: &ActionContext,
    ) -> Result<StageOutput, StageError>;
}
