//! Import pipeline stages
//!
//! One module per stage, each implementing [`crate::pipeline::ImportAction`].
//! [`default_stages`] fixes the pipeline order; the runner never reorders.

pub mod categorize;
pub mod clean;
pub mod duplicate_check;
pub mod images;
pub mod parse;
pub mod source_link;
pub mod structure;
pub mod tag;

use std::sync::Arc;

use crate::pipeline::ImportAction;

/// The fixed stage order for recipe imports
pub fn default_stages() -> Vec<Arc<dyn ImportAction>> {
    vec![
        Arc::new(clean::CleanStage::new()),
        Arc::new(structure::StructureStage::new()),
        Arc::new(parse::ParseStage::new()),
        Arc::new(source_link::SourceLinkStage::new()),
        Arc::new(images::ImagesStage::new()),
        Arc::new(duplicate_check::DuplicateCheckStage::new()),
        Arc::new(categorize::CategorizeStage::new()),
        Arc::new(tag::TagStage::new()),
    ]
}
