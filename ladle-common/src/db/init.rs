//! Database initialization
//!
//! Opens (or creates) the SQLite database and applies the schema. Creation is
//! idempotent so every service can call it at startup without coordination.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; required for the
    // multi-worker import pipeline
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent; also used directly by tests against
/// `:memory:` databases)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_notes_table(pool).await?;
    create_ingredient_lines_table(pool).await?;
    create_instruction_lines_table(pool).await?;
    create_note_tags_table(pool).await?;
    create_note_images_table(pool).await?;
    Ok(())
}

async fn create_notes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            guid TEXT PRIMARY KEY,
            import_id TEXT,
            title TEXT,
            title_fingerprint TEXT,
            source_url TEXT,
            category TEXT,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            duplicate_info TEXT,
            raw_text TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Fingerprint lookups drive candidate search; keep them indexed
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_notes_title_fingerprint ON notes(title_fingerprint)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ingredient_lines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingredient_lines (
            guid TEXT PRIMARY KEY,
            note_id TEXT NOT NULL REFERENCES notes(guid) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            reference TEXT NOT NULL,
            quantity REAL,
            unit TEXT,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ingredient_lines_note ON ingredient_lines(note_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_instruction_lines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instruction_lines (
            guid TEXT PRIMARY KEY,
            note_id TEXT NOT NULL REFERENCES notes(guid) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            text TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_instruction_lines_note ON instruction_lines(note_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_note_tags_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS note_tags (
            note_id TEXT NOT NULL REFERENCES notes(guid) ON DELETE CASCADE,
            tag TEXT NOT NULL,
            PRIMARY KEY (note_id, tag)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_note_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS note_images (
            guid TEXT PRIMARY KEY,
            note_id TEXT NOT NULL REFERENCES notes(guid) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            url TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
