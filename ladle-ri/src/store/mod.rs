//! Note store boundary
//!
//! The pipeline talks to persistence through the [`NoteStore`] trait so the
//! stages are testable with fakes and the duplicate-check core depends only on
//! this interface. The production implementation is [`sqlite::SqliteNoteStore`].

pub mod sqlite;

use async_trait::async_trait;
use ladle_common::db::models::{DuplicateInfo, IngredientLineRow, InstructionLineRow, NoteRow};
use ladle_common::Result;
use uuid::Uuid;

pub use sqlite::SqliteNoteStore;

/// A note plus its parsed ingredient and instruction lines
#[derive(Debug, Clone)]
pub struct NoteWithLines {
    pub note: NoteRow,
    pub ingredients: Vec<IngredientLineRow>,
    pub instructions: Vec<InstructionLineRow>,
}

impl NoteWithLines {
    /// Free-text ingredient references, in line order
    pub fn ingredient_references(&self) -> Vec<String> {
        self.ingredients.iter().map(|l| l.reference.clone()).collect()
    }
}

/// Candidate row returned by the similar-title search
#[derive(Debug, Clone)]
pub struct NoteSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub title_fingerprint: Option<String>,
    pub status: String,
}

/// Fields for creating a note during the structure stage
#[derive(Debug, Clone)]
pub struct NewNote {
    pub id: Uuid,
    pub import_id: Uuid,
    pub title: Option<String>,
    pub raw_text: String,
}

/// One parsed ingredient line to persist
#[derive(Debug, Clone)]
pub struct NewIngredientLine {
    pub reference: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub name: Option<String>,
}

/// Duplicate marking payload; persisted out-of-band on the note record
#[derive(Debug, Clone)]
pub struct DuplicateVerdict {
    /// Every candidate that cleared the match floor (id + title)
    pub existing_notes: Vec<(Uuid, String)>,
    /// Human-readable reason built from the top match
    pub duplicate_reason: String,
    /// Best confidence, rounded to 2 decimals
    pub confidence: f64,
}

impl From<&DuplicateVerdict> for DuplicateInfo {
    fn from(verdict: &DuplicateVerdict) -> Self {
        DuplicateInfo {
            existing_notes: verdict
                .existing_notes
                .iter()
                .map(|(id, title)| ladle_common::db::models::ExistingNoteRef {
                    id: *id,
                    title: title.clone(),
                })
                .collect(),
            duplicate_reason: verdict.duplicate_reason.clone(),
            confidence: verdict.confidence,
        }
    }
}

/// Persistence operations the pipeline stages depend on
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Fetch a note with its parsed ingredient and instruction lines
    async fn note_with_lines(&self, note_id: Uuid) -> Result<Option<NoteWithLines>>;

    /// Notes whose stored title fingerprint is within `max_hamming_distance`
    /// of `fingerprint`, excluding `exclude_note_id`. Rows without a usable
    /// title or fingerprint are not candidates.
    async fn notes_with_similar_titles(
        &self,
        fingerprint: &str,
        max_hamming_distance: u32,
        exclude_note_id: Uuid,
    ) -> Result<Vec<NoteSummary>>;

    /// Persist a freshly computed title fingerprint
    async fn update_title_fingerprint(&self, note_id: Uuid, fingerprint: &str) -> Result<()>;

    /// Mark a note as a duplicate of existing notes. Only the duplicate-check
    /// stage may call this.
    async fn mark_note_as_duplicate(&self, note_id: Uuid, verdict: DuplicateVerdict) -> Result<()>;

    /// Create the note record for an import
    async fn create_note(&self, note: NewNote) -> Result<()>;

    /// Replace the parsed ingredient lines of a note
    async fn replace_ingredient_lines(
        &self,
        note_id: Uuid,
        lines: Vec<NewIngredientLine>,
    ) -> Result<()>;

    /// Replace the parsed instruction lines of a note
    async fn replace_instruction_lines(&self, note_id: Uuid, lines: Vec<String>) -> Result<()>;

    /// Record the source URL the document was submitted from
    async fn set_source(&self, note_id: Uuid, source_url: &str) -> Result<()>;

    /// Register image references for a note
    async fn attach_images(&self, note_id: Uuid, urls: Vec<String>) -> Result<()>;

    /// Set the note category
    async fn set_category(&self, note_id: Uuid, category: &str) -> Result<()>;

    /// Replace the note's tags
    async fn replace_tags(&self, note_id: Uuid, tags: Vec<String>) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store fake recording side-effecting calls, for stage and
    //! runner unit tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct FakeStore {
        pub notes: Mutex<HashMap<Uuid, NoteWithLines>>,
        pub candidates: Mutex<Vec<NoteSummary>>,
        pub fingerprint_updates: Mutex<Vec<(Uuid, String)>>,
        pub duplicate_marks: Mutex<Vec<(Uuid, DuplicateVerdict)>>,
        /// When set, every store call fails with this message (I/O fault injection)
        pub fail_with: Mutex<Option<String>>,
    }

    impl FakeStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert_note(&self, note: NoteWithLines) {
            let id = Uuid::parse_str(&note.note.guid).expect("valid guid");
            self.notes.lock().unwrap().insert(id, note);
        }

        pub fn set_candidates(&self, candidates: Vec<NoteSummary>) {
            *self.candidates.lock().unwrap() = candidates;
        }

        pub fn fail_all_calls(&self, message: &str) {
            *self.fail_with.lock().unwrap() = Some(message.to_string());
        }

        fn check_fault(&self) -> Result<()> {
            if let Some(msg) = self.fail_with.lock().unwrap().clone() {
                return Err(ladle_common::Error::Internal(msg));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl NoteStore for FakeStore {
        async fn note_with_lines(&self, note_id: Uuid) -> Result<Option<NoteWithLines>> {
            self.check_fault()?;
            Ok(self.notes.lock().unwrap().get(&note_id).cloned())
        }

        async fn notes_with_similar_titles(
            &self,
            _fingerprint: &str,
            _max_hamming_distance: u32,
            exclude_note_id: Uuid,
        ) -> Result<Vec<NoteSummary>> {
            self.check_fault()?;
            Ok(self
                .candidates
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.id != exclude_note_id)
                .cloned()
                .collect())
        }

        async fn update_title_fingerprint(&self, note_id: Uuid, fingerprint: &str) -> Result<()> {
            self.check_fault()?;
            self.fingerprint_updates
                .lock()
                .unwrap()
                .push((note_id, fingerprint.to_string()));
            Ok(())
        }

        async fn mark_note_as_duplicate(
            &self,
            note_id: Uuid,
            verdict: DuplicateVerdict,
        ) -> Result<()> {
            self.check_fault()?;
            self.duplicate_marks.lock().unwrap().push((note_id, verdict));
            Ok(())
        }

        async fn create_note(&self, note: NewNote) -> Result<()> {
            self.check_fault()?;
            let row = NoteRow {
                guid: note.id.to_string(),
                import_id: Some(note.import_id.to_string()),
                title: note.title,
                title_fingerprint: None,
                source_url: None,
                category: None,
                status: ladle_common::db::models::NOTE_STATUS_ACTIVE.to_string(),
                duplicate_info: None,
                raw_text: Some(note.raw_text),
            };
            self.notes.lock().unwrap().insert(
                note.id,
                NoteWithLines {
                    note: row,
                    ingredients: Vec::new(),
                    instructions: Vec::new(),
                },
            );
            Ok(())
        }

        async fn replace_ingredient_lines(
            &self,
            note_id: Uuid,
            lines: Vec<NewIngredientLine>,
        ) -> Result<()> {
            self.check_fault()?;
            if let Some(entry) = self.notes.lock().unwrap().get_mut(&note_id) {
                entry.ingredients = lines
                    .into_iter()
                    .enumerate()
                    .map(|(i, l)| IngredientLineRow {
                        guid: Uuid::new_v4().to_string(),
                        note_id: note_id.to_string(),
                        position: i as i64,
                        reference: l.reference,
                        quantity: l.quantity,
                        unit: l.unit,
                        name: l.name,
                    })
                    .collect();
            }
            Ok(())
        }

        async fn replace_instruction_lines(
            &self,
            note_id: Uuid,
            lines: Vec<String>,
        ) -> Result<()> {
            self.check_fault()?;
            if let Some(entry) = self.notes.lock().unwrap().get_mut(&note_id) {
                entry.instructions = lines
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| InstructionLineRow {
                        guid: Uuid::new_v4().to_string(),
                        note_id: note_id.to_string(),
                        position: i as i64,
                        text,
                    })
                    .collect();
            }
            Ok(())
        }

        async fn set_source(&self, note_id: Uuid, source_url: &str) -> Result<()> {
            self.check_fault()?;
            if let Some(entry) = self.notes.lock().unwrap().get_mut(&note_id) {
                entry.note.source_url = Some(source_url.to_string());
            }
            Ok(())
        }

        async fn attach_images(&self, _note_id: Uuid, _urls: Vec<String>) -> Result<()> {
            self.check_fault()?;
            Ok(())
        }

        async fn set_category(&self, note_id: Uuid, category: &str) -> Result<()> {
            self.check_fault()?;
            if let Some(entry) = self.notes.lock().unwrap().get_mut(&note_id) {
                entry.note.category = Some(category.to_string());
            }
            Ok(())
        }

        async fn replace_tags(&self, _note_id: Uuid, _tags: Vec<String>) -> Result<()> {
            self.check_fault()?;
            Ok(())
        }
    }
}
