//! Database initialization
//!
//! Creates the SQLite pool and bootstraps the schema. All `create_*_table`
//! functions are idempotent and safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize the database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new catalog database: {}", db_path.display());
    } else {
        info!("Opened existing catalog database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL keeps readers unblocked while an ingestion transaction is open
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Concurrent ingestions for the same id serialize on the write lock
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_all_tables(&pool).await?;

    Ok(pool)
}

/// Create the full catalog schema (idempotent)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_container_types_table(pool).await?;
    create_datasets_table(pool).await?;
    create_keywords_table(pool).await?;
    create_files_table(pool).await?;
    create_software_table(pool).await?;
    create_dataset_keywords_table(pool).await?;
    create_dataset_files_table(pool).await?;
    create_dataset_software_table(pool).await?;
    Ok(())
}

/// Dataset rows cover both lifecycle stages; `is_placeholder` tags the stage.
/// `replaces_id` is a soft reference (no FK) so a placeholder row can be
/// deleted and replaced by the full record within one transaction while other
/// rows still point at the id.
pub async fn create_datasets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datasets (
            id TEXT PRIMARY KEY,
            is_placeholder INTEGER NOT NULL DEFAULT 0,
            owner TEXT,
            complete INTEGER NOT NULL DEFAULT 0,
            is_static INTEGER NOT NULL DEFAULT 0,
            created TEXT,
            modified TEXT,
            model_version TEXT,
            hash TEXT,
            replaces_id TEXT,
            container_type_id INTEGER REFERENCES container_types(id),
            author TEXT,
            email TEXT,
            title TEXT,
            comment TEXT,
            description TEXT,
            meta_timestamp TEXT,
            doi TEXT,
            license TEXT,
            size INTEGER,
            server_path TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_container_types_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS container_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            type_id TEXT,
            version TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_keywords_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS keywords (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Archive members, deduplicated by (name, size, content)
pub async fn create_files_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            size INTEGER NOT NULL,
            content TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_software_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS software (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            version TEXT,
            ident TEXT,
            id_type TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_dataset_keywords_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dataset_keywords (
            dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
            keyword_id INTEGER NOT NULL REFERENCES keywords(id),
            PRIMARY KEY (dataset_id, keyword_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_dataset_files_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dataset_files (
            dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
            file_id INTEGER NOT NULL REFERENCES files(id),
            position INTEGER NOT NULL,
            PRIMARY KEY (dataset_id, file_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_dataset_software_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dataset_software (
            dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
            software_id INTEGER NOT NULL REFERENCES software(id),
            position INTEGER NOT NULL,
            PRIMARY KEY (dataset_id, software_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
