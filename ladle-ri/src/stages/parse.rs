//! Parse stage: raw section lines to structured records
//!
//! Ingredient lines get a leading quantity/unit parse ("2 1/2 cups flour" →
//! quantity 2.5, unit "cup", name "flour"); the original line always survives
//! as the reference text. Instruction lines persist as ordered steps.

use async_trait::async_trait;
use ladle_common::events::StageContext;
use tracing::debug;

use crate::pipeline::{
    ActionContext, ImportAction, ImportPayload, StageCompletion, StageDeps, StageError, StageOutput,
};
use crate::store::NewIngredientLine;

/// Units recognized at the head of an ingredient line, singular form
const UNITS: &[(&str, &str)] = &[
    ("cups", "cup"),
    ("cup", "cup"),
    ("tablespoons", "tablespoon"),
    ("tablespoon", "tablespoon"),
    ("tbsp", "tablespoon"),
    ("teaspoons", "teaspoon"),
    ("teaspoon", "teaspoon"),
    ("tsp", "teaspoon"),
    ("grams", "gram"),
    ("gram", "gram"),
    ("g", "gram"),
    ("kg", "kilogram"),
    ("milliliters", "milliliter"),
    ("ml", "milliliter"),
    ("liters", "liter"),
    ("liter", "liter"),
    ("l", "liter"),
    ("ounces", "ounce"),
    ("ounce", "ounce"),
    ("oz", "ounce"),
    ("pounds", "pound"),
    ("pound", "pound"),
    ("lb", "pound"),
    ("lbs", "pound"),
    ("cloves", "clove"),
    ("clove", "clove"),
    ("pinch", "pinch"),
    ("slices", "slice"),
    ("slice", "slice"),
    ("cans", "can"),
    ("can", "can"),
];

/// Parse a token as a plain number or a fraction ("1/2")
fn parse_number(token: &str) -> Option<f64> {
    if let Ok(value) = token.parse::<f64>() {
        return Some(value);
    }
    let (numerator, denominator) = token.split_once('/')?;
    let numerator: f64 = numerator.parse().ok()?;
    let denominator: f64 = denominator.parse().ok()?;
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

/// Parse one ingredient line into quantity/unit/name, keeping the raw line as
/// the reference
pub fn parse_ingredient_line(line: &str) -> NewIngredientLine {
    let reference = line.trim().to_string();
    let mut tokens = reference.split_whitespace().peekable();

    let mut quantity = None;
    if let Some(first) = tokens.peek() {
        if let Some(value) = parse_number(first) {
            quantity = Some(value);
            tokens.next();
            // Mixed numbers: "1 1/2"
            if let Some(second) = tokens.peek() {
                if second.contains('/') {
                    if let Some(fraction) = parse_number(second) {
                        quantity = Some(value + fraction);
                        tokens.next();
                    }
                }
            }
        }
    }

    let mut unit = None;
    if quantity.is_some() {
        if let Some(next) = tokens.peek() {
            let lowered = next.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if let Some((_, canonical)) = UNITS.iter().find(|(alias, _)| *alias == lowered) {
                unit = Some((*canonical).to_string());
                tokens.next();
            }
        }
    }

    let name: String = tokens.collect::<Vec<_>>().join(" ");
    let name = name
        .trim_start_matches("of ")
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string();

    NewIngredientLine {
        reference,
        quantity,
        unit,
        name: if name.is_empty() { None } else { Some(name) },
    }
}

pub struct ParseStage;

impl ParseStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ParseStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportAction for ParseStage {
    fn name(&self) -> &'static str {
        "parse-lines"
    }

    fn context(&self) -> StageContext {
        StageContext::ParseLines
    }

    fn start_message(&self) -> &'static str {
        "Parsing ingredients and instructions..."
    }

    fn validate_input(&self, payload: &ImportPayload) -> Result<(), StageError> {
        if payload.note_id.is_none() {
            return Err(StageError::Validation(
                "Note ID is required for line parsing".to_string(),
            ));
        }
        if payload.sections.is_none() {
            return Err(StageError::Validation(
                "Document sections are required for line parsing".to_string(),
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
            StageError::Validation("Note ID is required for line parsing".to_string())
        })?;
        let sections = payload.sections.clone().ok_or_else(|| {
            StageError::Validation("Document sections are required for line parsing".to_string())
        })?;

        let ingredients: Vec<NewIngredientLine> = sections
            .ingredient_lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_ingredient_line(line))
            .collect();
        let instructions: Vec<String> = sections
            .instruction_lines
            .iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        let ingredient_count = ingredients.len();
        let instruction_count = instructions.len();

        deps.store.replace_ingredient_lines(note_id, ingredients).await?;
        deps.store
            .replace_instruction_lines(note_id, instructions)
            .await?;

        debug!(
            note_id = %note_id,
            ingredient_count,
            instruction_count,
            "Parsed recipe lines"
        );

        Ok(StageOutput {
            payload,
            completion: StageCompletion::with_metadata(
                "Ingredients and instructions parsed!",
                serde_json::json!({
                    "ingredientCount": ingredient_count,
                    "instructionCount": instruction_count,
                }),
            ),
        })
    }
}
