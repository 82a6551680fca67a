//! Clean stage: HTML document to visible text blocks
//!
//! Parses the submitted HTML and extracts headings, paragraphs and list items
//! in document order, dropping script/style content. Later stages work on the
//! block list only; the raw HTML is not threaded further.

use async_trait::async_trait;
use ladle_common::events::StageContext;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::pipeline::{
    ActionContext, Block, BlockKind, CleanedDocument, ImportAction, ImportPayload, StageCompletion,
    StageDeps, StageError, StageOutput,
};

pub struct CleanStage;

impl CleanStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CleanStage {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse runs of whitespace and trim
fn collapse_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract title candidate and content blocks from an HTML document
pub fn clean_document(html: &str) -> CleanedDocument {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse("head > title").expect("title selector");
    let block_selector = Selector::parse("h1, h2, h3, h4, h5, h6, p, li").expect("block selector");

    let mut title = document
        .select(&title_selector)
        .next()
        .map(collapse_text)
        .filter(|t| !t.is_empty());

    let mut blocks = Vec::new();
    for element in document.select(&block_selector) {
        let text = collapse_text(element);
        if text.is_empty() {
            continue;
        }
        let kind = match element.value().name() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => BlockKind::Heading,
            "li" => BlockKind::ListItem,
            _ => BlockKind::Paragraph,
        };
        // An li containing only a nested p would otherwise appear twice
        if kind == BlockKind::Paragraph
            && blocks
                .last()
                .is_some_and(|b: &Block| b.kind == BlockKind::ListItem && b.text == text)
        {
            continue;
        }
        blocks.push(Block { kind, text });
    }

    // Fall back to the first heading when <title> is absent
    if title.is_none() {
        title = blocks
            .iter()
            .find(|b| b.kind == BlockKind::Heading)
            .map(|b| b.text.clone());
    }

    CleanedDocument { title, blocks }
}

#[async_trait]
impl ImportAction for CleanStage {
    fn name(&self) -> &'static str {
        "clean-document"
    }

    fn context(&self) -> StageContext {
        StageContext::CleanDocument
    }

    fn start_message(&self) -> &'static str {
        "Cleaning up your recipe document..."
    }

    fn validate_input(&self, payload: &ImportPayload) -> Result<(), StageError> {
        match payload.html.as_deref() {
            Some(html) if !html.trim().is_empty() => Ok(()),
            _ => Err(StageError::Validation(
                "Document HTML is required for cleaning".to_string(),
            )),
        }
    }

    async fn execute(
        &self,
        mut payload: ImportPayload,
        _deps: &StageDeps,
        _ctx: &ActionContext,
    ) -> Result<StageOutput, StageError> {
        let html = payload.html.take().ok_or_else(|| {
            StageError::Validation("Document HTML is required for cleaning".to_string())
        })?;

        let document = clean_document(&html);
        debug!(
            import_id = %payload.import_id,
            title = ?document.title,
            blocks = document.blocks.len(),
            "Cleaned document"
        );

        let block_count = document.blocks.len();
        payload.document = Some(document);

        Ok(StageOutput {
            payload,
            completion: StageCompletion::with_metadata(
                "Document cleaned!",
                serde_json::json!({ "blockCount": block_count }),
            ),
        })
    }
}
