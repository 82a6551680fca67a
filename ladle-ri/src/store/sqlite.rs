//! SQLite-backed note store

use async_trait::async_trait;
use ladle_common::db::models::{
    DuplicateInfo, IngredientLineRow, InstructionLineRow, NoteRow, NOTE_STATUS_DUPLICATE,
};
use ladle_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::similarity::fingerprint::hamming_distance;
use crate::store::{
    DuplicateVerdict, NewIngredientLine, NewNote, NoteStore, NoteSummary, NoteWithLines,
};

/// Production [`NoteStore`] over the shared SQLite pool
pub struct SqliteNoteStore {
    db: Pool<Sqlite>,
}

impl SqliteNoteStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

fn parse_guid(guid: &str) -> Result<Uuid> {
    Uuid::parse_str(guid).map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))
}

#[async_trait]
impl NoteStore for SqliteNoteStore {
    async fn note_with_lines(&self, note_id: Uuid) -> Result<Option<NoteWithLines>> {
        let note: Option<NoteRow> = sqlx::query_as(
            r#"
            SELECT guid, import_id, title, title_fingerprint, source_url,
                   category, status, duplicate_info, raw_text
            FROM notes WHERE guid = ?
            "#,
        )
        .bind(note_id.to_string())
        .fetch_optional(&self.db)
        .await?;

        let Some(note) = note else {
            return Ok(None);
        };

        let ingredients: Vec<IngredientLineRow> = sqlx::query_as(
            r#"
            SELECT guid, note_id, position, reference, quantity, unit, name
            FROM ingredient_lines WHERE note_id = ? ORDER BY position
            "#,
        )
        .bind(note_id.to_string())
        .fetch_all(&self.db)
        .await?;

        let instructions: Vec<InstructionLineRow> = sqlx::query_as(
            r#"
            SELECT guid, note_id, position, text
            FROM instruction_lines WHERE note_id = ? ORDER BY position
            "#,
        )
        .bind(note_id.to_string())
        .fetch_all(&self.db)
        .await?;

        Ok(Some(NoteWithLines {
            note,
            ingredients,
            instructions,
        }))
    }

    async fn notes_with_similar_titles(
        &self,
        fingerprint: &str,
        max_hamming_distance: u32,
        exclude_note_id: Uuid,
    ) -> Result<Vec<NoteSummary>> {
        // SQL narrows to rows that can be compared at all (titled, with a
        // stored fingerprint); the Hamming window is applied in process since
        // SQLite has no bit-distance function
        let rows: Vec<(String, Option<String>, Option<String>, String)> = sqlx::query_as(
            r#"
            SELECT guid, title, title_fingerprint, status
            FROM notes
            WHERE guid != ?
              AND title IS NOT NULL AND TRIM(title) != ''
              AND title_fingerprint IS NOT NULL AND title_fingerprint != ''
            "#,
        )
        .bind(exclude_note_id.to_string())
        .fetch_all(&self.db)
        .await?;

        let mut candidates = Vec::new();
        for (guid, title, title_fingerprint, status) in rows {
            let within = title_fingerprint
                .as_deref()
                .map(|fp| hamming_distance(fingerprint, fp) <= max_hamming_distance)
                .unwrap_or(false);
            if within {
                candidates.push(NoteSummary {
                    id: parse_guid(&guid)?,
                    title,
                    title_fingerprint,
                    status,
                });
            }
        }

        Ok(candidates)
    }

    async fn update_title_fingerprint(&self, note_id: Uuid, fingerprint: &str) -> Result<()> {
        sqlx::query(
            "UPDATE notes SET title_fingerprint = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
        )
        .bind(fingerprint)
        .bind(note_id.to_string())
        .execute(&self.db)
        .await?;

        tracing::debug!(note_id = %note_id, "Updated title fingerprint");
        Ok(())
    }

    async fn mark_note_as_duplicate(&self, note_id: Uuid, verdict: DuplicateVerdict) -> Result<()> {
        let info = DuplicateInfo::from(&verdict);
        let info_json = serde_json::to_string(&info)
            .map_err(|e| Error::Internal(format!("Failed to serialize JSON: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE notes
            SET status = ?, duplicate_info = ?, updated_at = CURRENT_TIMESTAMP
            WHERE guid = ?
            "#,
        )
        .bind(NOTE_STATUS_DUPLICATE)
        .bind(&info_json)
        .bind(note_id.to_string())
        .execute(&self.db)
        .await?;

        tracing::info!(
            note_id = %note_id,
            confidence = verdict.confidence,
            existing = verdict.existing_notes.len(),
            "Note marked as duplicate"
        );
        Ok(())
    }

    async fn create_note(&self, note: NewNote) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notes (guid, import_id, title, raw_text)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(note.id.to_string())
        .bind(note.import_id.to_string())
        .bind(&note.title)
        .bind(&note.raw_text)
        .execute(&self.db)
        .await?;

        tracing::debug!(note_id = %note.id, title = ?note.title, "Created note");
        Ok(())
    }

    async fn replace_ingredient_lines(
        &self,
        note_id: Uuid,
        lines: Vec<NewIngredientLine>,
    ) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM ingredient_lines WHERE note_id = ?")
            .bind(note_id.to_string())
            .execute(&mut *tx)
            .await?;

        for (position, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO ingredient_lines (guid, note_id, position, reference, quantity, unit, name)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(note_id.to_string())
            .bind(position as i64)
            .bind(&line.reference)
            .bind(line.quantity)
            .bind(&line.unit)
            .bind(&line.name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn replace_instruction_lines(&self, note_id: Uuid, lines: Vec<String>) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM instruction_lines WHERE note_id = ?")
            .bind(note_id.to_string())
            .execute(&mut *tx)
            .await?;

        for (position, text) in lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO instruction_lines (guid, note_id, position, text) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(note_id.to_string())
            .bind(position as i64)
            .bind(text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_source(&self, note_id: Uuid, source_url: &str) -> Result<()> {
        sqlx::query("UPDATE notes SET source_url = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
            .bind(source_url)
            .bind(note_id.to_string())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn attach_images(&self, note_id: Uuid, urls: Vec<String>) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM note_images WHERE note_id = ?")
            .bind(note_id.to_string())
            .execute(&mut *tx)
            .await?;

        for (position, url) in urls.iter().enumerate() {
            sqlx::query(
                "INSERT INTO note_images (guid, note_id, position, url) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(note_id.to_string())
            .bind(position as i64)
            .bind(url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_category(&self, note_id: Uuid, category: &str) -> Result<()> {
        sqlx::query("UPDATE notes SET category = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
            .bind(category)
            .bind(note_id.to_string())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn replace_tags(&self, note_id: Uuid, tags: Vec<String>) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM note_tags WHERE note_id = ?")
            .bind(note_id.to_string())
            .execute(&mut *tx)
            .await?;

        for tag in &tags {
            sqlx::query("INSERT OR IGNORE INTO note_tags (note_id, tag) VALUES (?, ?)")
                .bind(note_id.to_string())
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
