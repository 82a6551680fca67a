//! Tag stage: derive note tags from parsed ingredient names

use async_trait::async_trait;
use ladle_common::events::StageContext;
use tracing::info;

use crate::pipeline::{
    ActionContext, ImportAction, ImportPayload, StageCompletion, StageDeps, StageError, StageOutput,
};
use crate::stages::parse::parse_ingredient_line;

/// Cap on derived tags per note
const MAX_TAGS: usize = 8;

/// Words that make poor tags on their own
const TAG_STOP_WORDS: &[&str] = &[
    "fresh", "large", "small", "medium", "chopped", "diced", "minced", "ground", "to", "taste",
    "optional", "and", "or", "of",
];

/// Derive tags from raw ingredient lines: parse out the ingredient name, strip
/// descriptors, dedupe, cap at [`MAX_TAGS`]
pub fn derive_tags(ingredient_lines: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for line in ingredient_lines {
        let parsed = parse_ingredient_line(line);
        let Some(name) = parsed.name else { continue };

        let tag = name
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty() && !TAG_STOP_WORDS.contains(w))
            .collect::<Vec<_>>()
            .join(" ");

        if tag.is_empty() || tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

pub struct TagStage;

impl TagStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TagStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportAction for TagStage {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn context(&self) -> StageContext {
        StageContext::Tag
    }

    fn start_message(&self) -> &'static str {
        "Tagging the recipe..."
    }

    fn validate_input(&self, payload: &ImportPayload) -> Result<(), StageError> {
        if payload.note_id.is_none() {
            return Err(StageError::Validation(
                "Note ID is required for tagging".to_string(),
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
        let note_id = payload
            .note_id
            .ok_or_else(|| StageError::Validation("Note ID is required for tagging".to_string()))?;

        let tags = payload
            .sections
            .as_ref()
            .map(|s| derive_tags(&s.ingredient_lines))
            .unwrap_or_default();
        let tag_count = tags.len();

        if tag_count > 0 {
            deps.store.replace_tags(note_id, tags).await?;
        }
        info!(note_id = %note_id, tag_count, "Tags derived");

        Ok(StageOutput {
            payload,
            completion: StageCompletion::with_metadata(
                if tag_count > 0 {
                    "Recipe tagged!"
                } else {
                    "No tags derived."
                },
                serde_json::json!({ "tagCount": tag_count }),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tags_from_ingredient_names() {
        let tags = derive_tags(&lines(&["2 cups flour", "1 cup sugar", "3 eggs"]));
        assert_eq!(tags, vec!["flour", "sugar", "eggs"]);
    }

    #[test]
    fn test_descriptors_stripped() {
        let tags = derive_tags(&lines(&["1 large onion, chopped", "2 cloves garlic, minced"]));
        assert_eq!(tags, vec!["onion", "garlic"]);
    }

    #[test]
    fn test_duplicates_collapsed() {
        let tags = derive_tags(&lines(&["1 cup sugar", "2 cups sugar"]));
        assert_eq!(tags, vec!["sugar"]);
    }

    #[test]
    fn test_tag_cap() {
        let many: Vec<String> = (0..20).map(|i| format!("1 cup ingredient{}", i)).collect();
        assert_eq!(derive_tags(&many).len(), MAX_TAGS);
    }

    #[test]
    fn test_stop_word_only_lines_skipped() {
        let tags = derive_tags(&lines(&["to taste", "1 cup sugar"]));
        assert_eq!(tags, vec!["sugar"]);
    }
}
