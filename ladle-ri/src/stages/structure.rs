//! Structure stage: create the note record and locate recipe sections
//!
//! Splits the cleaned block list into ingredient and instruction sections by
//! heading keywords, then creates the note row. Everything after this stage
//! operates on a persisted note.

use async_trait::async_trait;
use ladle_common::events::StageContext;
use tracing::{debug, info};
use uuid::Uuid;

use crate::pipeline::{
    ActionContext, Block, BlockKind, DocumentSections, ImportAction, ImportPayload,
    StageCompletion, StageDeps, StageError, StageOutput,
};
use crate::store::NewNote;

const INGREDIENT_HEADINGS: &[&str] = &["ingredient"];
const INSTRUCTION_HEADINGS: &[&str] = &["instruction", "direction", "method", "preparation", "step"];

pub struct StructureStage;

impl StructureStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StructureStage {
    fn default() -> Self {
        Self::new()
    }
}

fn heading_matches(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Ingredients,
    Instructions,
}

/// Partition blocks into ingredient and instruction lines.
///
/// Section membership follows the most recent matching heading. Documents
/// without recognizable headings fall back to "list items are ingredients,
/// paragraphs after the first list are instructions".
pub fn split_sections(blocks: &[Block]) -> DocumentSections {
    let has_headings = blocks.iter().any(|b| {
        b.kind == BlockKind::Heading
            && (heading_matches(&b.text, INGREDIENT_HEADINGS)
                || heading_matches(&b.text, INSTRUCTION_HEADINGS))
    });

    let mut sections = DocumentSections::default();

    if has_headings {
        let mut current = Section::Preamble;
        for block in blocks {
            if block.kind == BlockKind::Heading {
                if heading_matches(&block.text, INGREDIENT_HEADINGS) {
                    current = Section::Ingredients;
                } else if heading_matches(&block.text, INSTRUCTION_HEADINGS) {
                    current = Section::Instructions;
                } else {
                    current = Section::Preamble;
                }
                continue;
            }
            match current {
                Section::Ingredients => sections.ingredient_lines.push(block.text.clone()),
                Section::Instructions => sections.instruction_lines.push(block.text.clone()),
                Section::Preamble => {}
            }
        }
    } else {
        let mut seen_list = false;
        for block in blocks {
            match block.kind {
                BlockKind::ListItem => {
                    seen_list = true;
                    sections.ingredient_lines.push(block.text.clone());
                }
                BlockKind::Paragraph if seen_list => {
                    sections.instruction_lines.push(block.text.clone());
                }
                _ => {}
            }
        }
    }

    sections
}

#[async_trait]
impl ImportAction for StructureStage {
    fn name(&self) -> &'static str {
        "structure-document"
    }

    fn context(&self) -> StageContext {
        StageContext::StructureDocument
    }

    fn start_message(&self) -> &'static str {
        "Structuring the recipe..."
    }

    fn validate_input(&self, payload: &ImportPayload) -> Result<(), StageError> {
        if payload.document.is_none() {
            return Err(StageError::Validation(
                "Cleaned document is required for structuring".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        mut payload: ImportPayload,
        deps: &StageDeps,
        _ctx: &ActionContext,
    ) -> Result<StageOutput, StageError> {
        let document = payload.document.take().ok_or_else(|| {
            StageError::Validation("Cleaned document is required for structuring".to_string())
        })?;

        let sections = split_sections(&document.blocks);
        debug!(
            import_id = %payload.import_id,
            ingredients = sections.ingredient_lines.len(),
            instructions = sections.instruction_lines.len(),
            "Sections located"
        );

        let raw_text = document
            .blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let note_id = Uuid::new_v4();
        deps.store
            .create_note(NewNote {
                id: note_id,
                import_id: payload.import_id,
                title: document.title.clone(),
                raw_text,
            })
            .await?;
        info!(
            import_id = %payload.import_id,
            note_id = %note_id,
            title = ?document.title,
            "Note created"
        );

        payload.note_id = Some(note_id);
        payload.document = Some(document);
        payload.sections = Some(sections);

        Ok(StageOutput {
            payload,
            completion: StageCompletion::new("Recipe structured!"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(text: &str) -> Block {
        Block {
            kind: BlockKind::Heading,
            text: text.to_string(),
        }
    }

    fn item(text: &str) -> Block {
        Block {
            kind: BlockKind::ListItem,
            text: text.to_string(),
        }
    }

    fn para(text: &str) -> Block {
        Block {
            kind: BlockKind::Paragraph,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_split_by_headings() {
        let blocks = vec![
            heading("Vanilla Cake"),
            para("A simple cake."),
            heading("Ingredients"),
            item("2 cups flour"),
            item("1 cup sugar"),
            heading("Instructions"),
            item("Mix everything."),
            item("Bake at 350F."),
        ];
        let sections = split_sections(&blocks);
        assert_eq!(sections.ingredient_lines, vec!["2 cups flour", "1 cup sugar"]);
        assert_eq!(sections.instruction_lines, vec!["Mix everything.", "Bake at 350F."]);
    }

    #[test]
    fn test_directions_heading_recognized() {
        let blocks = vec![
            heading("Ingredients"),
            item("1 onion"),
            heading("Directions"),
            para("Chop the onion."),
        ];
        let sections = split_sections(&blocks);
        assert_eq!(sections.ingredient_lines, vec!["1 onion"]);
        assert_eq!(sections.instruction_lines, vec!["Chop the onion."]);
    }

    #[test]
    fn test_unrelated_heading_resets_section() {
        let blocks = vec![
            heading("Ingredients"),
            item("1 onion"),
            heading("Notes"),
            para("Keeps for a week."),
        ];
        let sections = split_sections(&blocks);
        assert_eq!(sections.ingredient_lines, vec!["1 onion"]);
        assert!(sections.instruction_lines.is_empty());
    }

    #[test]
    fn test_fallback_without_headings() {
        let blocks = vec![
            para("My stew."),
            item("1 lb beef"),
            item("2 carrots"),
            para("Brown the beef."),
            para("Add carrots and simmer."),
        ];
        let sections = split_sections(&blocks);
        assert_eq!(sections.ingredient_lines, vec!["1 lb beef", "2 carrots"]);
        assert_eq!(
            sections.instruction_lines,
            vec!["Brown the beef.", "Add carrots and simmer."]
        );
    }

    #[tokio::test]
    async fn test_execute_creates_note_and_sets_payload() {
        use crate::store::testing::FakeStore;
        use std::sync::Arc;

        let store = Arc::new(FakeStore::new());
        let deps = StageDeps {
            store: store.clone(),
            broadcaster: None,
        };
        let payload = ImportPayload {
            import_id: Uuid::new_v4(),
            html: None,
            source_url: None,
            image_urls: Vec::new(),
            note_id: None,
            document: Some(crate::pipeline::CleanedDocument {
                title: Some("Vanilla Cake".to_string()),
                blocks: vec![heading("Ingredients"), item("2 cups flour")],
            }),
            sections: None,
        };
        let ctx = ActionContext {
            job_id: Uuid::new_v4(),
            queue: crate::queue::QUEUE_NAME,
            attempt: 1,
            started_at: chrono::Utc::now(),
        };

        let stage = StructureStage::new();
        let output = stage.execute(payload, &deps, &ctx).await.unwrap();

        let note_id = output.payload.note_id.expect("note id set");
        let stored = store.notes.lock().unwrap();
        let stored_note = stored.get(&note_id).expect("note persisted");
        assert_eq!(stored_note.note.title.as_deref(), Some("Vanilla Cake"));
        assert_eq!(
            output.payload.sections.as_ref().unwrap().ingredient_lines,
            vec!["2 cups flour"]
        );
    }
}
