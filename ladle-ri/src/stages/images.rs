//! Attach-images stage: register submitted image references
//!
//! Image bytes live in object storage owned by another service; the pipeline
//! only records the references on the note.

use async_trait::async_trait;
use ladle_common::events::StageContext;
use tracing::info;

use crate::pipeline::{
    ActionContext, ImportAction, ImportPayload, StageCompletion, StageDeps, StageError, StageOutput,
};

pub struct ImagesStage;

impl ImagesStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImagesStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportAction for ImagesStage {
    fn name(&self) -> &'static str {
        "attach-images"
    }

    fn context(&self) -> StageContext {
        StageContext::AttachImages
    }

    fn start_message(&self) -> &'static str {
        "Attaching recipe images..."
    }

    fn validate_input(&self, payload: &ImportPayload) -> Result<(), StageError> {
        if payload.note_id.is_none() {
            return Err(StageError::Validation(
                "Note ID is required for image attachment".to_string(),
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
            StageError::Validation("Note ID is required for image attachment".to_string())
        })?;

        let urls: Vec<String> = payload
            .image_urls
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        let image_count = urls.len();

        if image_count > 0 {
            deps.store.attach_images(note_id, urls).await?;
            info!(note_id = %note_id, image_count, "Images attached");
        } else {
            info!(note_id = %note_id, "No images submitted");
        }

        Ok(StageOutput {
            payload,
            completion: StageCompletion::with_metadata(
                if image_count > 0 {
                    "Images attached!"
                } else {
                    "No images to attach."
                },
                serde_json::json!({ "imageCount": image_count }),
            ),
        })
    }
}
