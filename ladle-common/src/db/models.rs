//! Row models for the Ladle schema
//!
//! UUIDs are stored as TEXT; the store layer converts to `uuid::Uuid` at its
//! boundary.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Note status values persisted in `notes.status`
pub const NOTE_STATUS_ACTIVE: &str = "ACTIVE";
/// A note marked as a high-confidence duplicate of existing notes
pub const NOTE_STATUS_DUPLICATE: &str = "DUPLICATE";

/// A recipe note row (without timestamps; queries select the working columns)
#[derive(Debug, Clone, FromRow)]
pub struct NoteRow {
    pub guid: String,
    pub import_id: Option<String>,
    pub title: Option<String>,
    pub title_fingerprint: Option<String>,
    pub source_url: Option<String>,
    pub category: Option<String>,
    pub status: String,
    pub duplicate_info: Option<String>,
    pub raw_text: Option<String>,
}

/// A parsed ingredient line belonging to a note
#[derive(Debug, Clone, FromRow)]
pub struct IngredientLineRow {
    pub guid: String,
    pub note_id: String,
    pub position: i64,
    /// The free-text line as submitted ("2 cups flour, sifted")
    pub reference: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub name: Option<String>,
}

/// A parsed instruction step belonging to a note
#[derive(Debug, Clone, FromRow)]
pub struct InstructionLineRow {
    pub guid: String,
    pub note_id: String,
    pub position: i64,
    pub text: String,
}

/// Duplicate marking payload persisted into `notes.duplicate_info` as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateInfo {
    pub existing_notes: Vec<ExistingNoteRef>,
    pub duplicate_reason: String,
    pub confidence: f64,
}

/// Reference to an already-stored note a duplicate points at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingNoteRef {
    pub id: uuid::Uuid,
    pub title: String,
}
