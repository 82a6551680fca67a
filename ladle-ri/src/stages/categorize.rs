//! Categorize stage: assign the note to one of the fixed categories
//!
//! Keyword hits over the title and ingredient lines pick the category; fuzzy
//! title-word matching (Jaro-Winkler) catches plurals and near-misses the
//! keyword list doesn't spell out.

use async_trait::async_trait;
use ladle_common::events::StageContext;
use tracing::info;

use crate::pipeline::{
    ActionContext, ImportAction, ImportPayload, StageCompletion, StageDeps, StageError, StageOutput,
};

/// Fuzzy match floor for keyword comparison
const FUZZY_THRESHOLD: f64 = 0.92;

/// Category definitions: name plus signal keywords
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Dessert",
        &["cake", "cookie", "brownie", "pie", "pudding", "chocolate", "caramel", "frosting"],
    ),
    ("Soup", &["soup", "stew", "broth", "chowder", "bisque"]),
    ("Salad", &["salad", "slaw", "vinaigrette"]),
    ("Bread", &["bread", "loaf", "roll", "bun", "dough", "yeast", "sourdough"]),
    ("Breakfast", &["pancake", "waffle", "omelette", "oatmeal", "granola", "scrambled"]),
    ("Drink", &["smoothie", "lemonade", "cocktail", "punch", "latte"]),
    ("Main Course", &["chicken", "beef", "pork", "fish", "pasta", "curry", "casserole", "roast"]),
];

/// Pick the best category for a title + ingredient lines, if any keyword
/// signal exists
pub fn pick_category(title: Option<&str>, ingredient_lines: &[String]) -> Option<&'static str> {
    let mut text_words: Vec<String> = Vec::new();
    if let Some(title) = title {
        text_words.extend(title.to_lowercase().split_whitespace().map(String::from));
    }
    for line in ingredient_lines {
        text_words.extend(line.to_lowercase().split_whitespace().map(String::from));
    }
    if text_words.is_empty() {
        return None;
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (category, keywords) in CATEGORIES {
        let mut hits = 0;
        for keyword in *keywords {
            let matched = text_words.iter().any(|word| {
                let word = word.trim_matches(|c: char| !c.is_alphanumeric());
                word == *keyword || strsim::jaro_winkler(word, keyword) >= FUZZY_THRESHOLD
            });
            if matched {
                hits += 1;
            }
        }
        if hits > 0 && best.map(|(_, b)| hits > b).unwrap_or(true) {
            best = Some((*category, hits));
        }
    }

    best.map(|(category, _)| category)
}

pub struct CategorizeStage;

impl CategorizeStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CategorizeStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportAction for CategorizeStage {
    fn name(&self) -> &'static str {
        "categorize"
    }

    fn context(&self) -> StageContext {
        StageContext::Categorize
    }

    fn start_message(&self) -> &'static str {
        "Categorizing the recipe..."
    }

    fn validate_input(&self, payload: &ImportPayload) -> Result<(), StageError> {
        if payload.note_id.is_none() {
            return Err(StageError::Validation(
                "Note ID is required for categorization".to_string(),
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
            StageError::Validation("Note ID is required for categorization".to_string())
        })?;

        let title = payload
            .document
            .as_ref()
            .and_then(|d| d.title.as_deref());
        let ingredient_lines = payload
            .sections
            .as_ref()
            .map(|s| s.ingredient_lines.as_slice())
            .unwrap_or(&[]);

        let completion = match pick_category(title, ingredient_lines) {
            Some(category) => {
                deps.store.set_category(note_id, category).await?;
                info!(note_id = %note_id, category, "Category assigned");
                StageCompletion::with_metadata(
                    "Recipe categorized!",
                    serde_json::json!({ "category": category }),
                )
            }
            None => {
                info!(note_id = %note_id, "No category signal found");
                StageCompletion::new("No category matched.")
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

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_title_keyword_wins() {
        assert_eq!(pick_category(Some("Chicken Noodle Soup"), &[]), Some("Soup"));
        assert_eq!(pick_category(Some("Vanilla Cake"), &[]), Some("Dessert"));
    }

    #[test]
    fn test_ingredients_contribute() {
        let category = pick_category(
            None,
            &lines(&["1 lb chicken breast", "8 oz pasta", "1 cup cream"]),
        );
        assert_eq!(category, Some("Main Course"));
    }

    #[test]
    fn test_fuzzy_plural_match() {
        // "cakes" is not in the keyword list but matches "cake" fuzzily
        assert_eq!(pick_category(Some("Mini Cakes"), &[]), Some("Dessert"));
    }

    #[test]
    fn test_more_hits_wins() {
        // Two dessert keywords against one bread keyword
        let category = pick_category(
            Some("Chocolate Brownie Loaf"),
            &[],
        );
        assert_eq!(category, Some("Dessert"));
    }

    #[test]
    fn test_no_signal_is_none() {
        assert_eq!(pick_category(Some("Something Mysterious"), &[]), None);
        assert_eq!(pick_category(None, &[]), None);
    }
}
