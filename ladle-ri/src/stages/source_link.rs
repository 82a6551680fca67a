//! Connect-source stage: record where the document came from

use async_trait::async_trait;
use ladle_common::events::StageContext;
use tracing::info;

use crate::pipeline::{
    ActionContext, ImportAction, ImportPayload, StageCompletion, StageDeps, StageError, StageOutput,
};

pub struct SourceLinkStage;

impl SourceLinkStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SourceLinkStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportAction for SourceLinkStage {
    fn name(&self) -> &'static str {
        "connect-source"
    }

    fn context(&self) -> StageContext {
        StageContext::ConnectSource
    }

    fn start_message(&self) -> &'static str {
        "Connecting the recipe to its source..."
    }

    fn validate_input(&self, payload: &ImportPayload) -> Result<(), StageError> {
        if payload.note_id.is_none() {
            return Err(StageError::Validation(
                "Note ID is required for source connection".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        payload: ImportPayload,
        deps: &StageDeps,
        _ctx: &ActionContext,
    ) -> Result<StageOutput, StageError> {
        let note_id = payload.note_id.ok_or_else(|| {
            StageError::Validation("Note ID is required for source connection".to_string())
        })?;

        // A submission without a source URL is a pasted document, not an error
        let completion = match payload.source_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                deps.store.set_source(note_id, url.trim()).await?;
                info!(note_id = %note_id, source_url = url, "Source connected");
                StageCompletion::with_metadata(
                    "Source connected!",
                    serde_json::json!({ "sourceUrl": url.trim() }),
                )
            }
            _ => {
                info!(note_id = %note_id, "No source URL submitted; nothing to connect");
                StageCompletion::new("No source to connect.")
            }
        };

        Ok(StageOutput {
            payload,
            completion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FakeStore;
    use crate::store::NoteStore;
    use std::sync::Arc;
    use uuid::Uuid;

    async fn run_with_source(source_url: Option<&str>) -> (Arc<FakeStore>, Uuid, StageOutput) {
        let store = Arc::new(FakeStore::new());
        let note_id = Uuid::new_v4();
        store
            .create_note(crate::store::NewNote {
                id: note_id,
                import_id: Uuid::new_v4(),
                title: Some("Cake".to_string()),
                raw_text: String::new(),
            })
            .await
            .unwrap();

        let payload = ImportPayload {
            import_id: Uuid::new_v4(),
            html: None,
            source_url: source_url.map(|s| s.to_string()),
            image_urls: Vec::new(),
            note_id: Some(note_id),
            document: None,
            sections: None,
        };
        let ctx = ActionContext {
            job_id: Uuid::new_v4(),
            queue: crate::queue::QUEUE_NAME,
            attempt: 1,
            started_at: chrono::Utc::now(),
        };
        let deps = StageDeps {
            store: store.clone(),
            broadcaster: None,
        };

        let output = SourceLinkStage::new()
            .execute(payload, &deps, &ctx)
            .await
            .unwrap();
        (store, note_id, output)
    }

    #[tokio::test]
    async fn test_source_persisted() {
        let (store, note_id, output) = run_with_source(Some("https://example.com/cake")).await;
        let notes = store.notes.lock().unwrap();
        assert_eq!(
            notes.get(&note_id).unwrap().note.source_url.as_deref(),
            Some("https://example.com/cake")
        );
        assert_eq!(output.completion.message, "Source connected!");
    }

    #[tokio::test]
    async fn test_missing_source_is_success() {
        let (store, note_id, output) = run_with_source(None).await;
        let notes = store.notes.lock().unwrap();
        assert!(notes.get(&note_id).unwrap().note.source_url.is_none());
        assert_eq!(output.completion.message, "No source to connect.");
    }
}
