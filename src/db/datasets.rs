//! Dataset persistence
//!
//! A dataset id maps to exactly one row in `datasets`; `is_placeholder`
//! distinguishes the two lifecycle stages. Side entities (keywords, embedded
//! files, software) hang off join tables and are rewritten whenever a record
//! is saved.

use crate::models::{ContainerType, DatasetEntry, DatasetRecord, EmbeddedFile, Keyword, UsedSoftware};
use crate::{MetaDbError, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Load whichever stage of the dataset exists for this id
pub async fn load_entry(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<DatasetEntry>> {
    let row = sqlx::query("SELECT is_placeholder FROM datasets WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        None => Ok(None),
        Some(row) => {
            if row.get::<i64, _>("is_placeholder") != 0 {
                Ok(Some(DatasetEntry::Placeholder(id)))
            } else {
                let record = load_full(conn, id).await?.ok_or_else(|| {
                    MetaDbError::Internal(format!("dataset row {} vanished mid-read", id))
                })?;
                Ok(Some(DatasetEntry::Full(record)))
            }
        }
    }
}

/// Resolve a cross-reference target: the stored entry if any, otherwise a
/// freshly created placeholder. Never fails for a well-formed id.
pub async fn get_or_create_placeholder(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<DatasetEntry> {
    if let Some(entry) = load_entry(conn, id).await? {
        return Ok(entry);
    }

    sqlx::query("INSERT INTO datasets (id, is_placeholder) VALUES (?, 1)")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(DatasetEntry::Placeholder(id))
}

/// Delete a dataset row and its links (placeholder promotion, mostly)
pub async fn delete_dataset(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM datasets WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Insert a new full record (row plus links)
pub async fn insert_full(conn: &mut SqliteConnection, record: &DatasetRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO datasets (
            id, is_placeholder, owner, complete, is_static,
            created, modified, model_version, hash, replaces_id,
            container_type_id, author, email, title, comment,
            description, meta_timestamp, doi, license, size, server_path
        )
        VALUES (?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.owner)
    .bind(record.complete)
    .bind(record.is_static)
    .bind(record.created.map(|ts| ts.to_rfc3339()))
    .bind(record.modified.map(|ts| ts.to_rfc3339()))
    .bind(&record.model_version)
    .bind(&record.hash)
    .bind(record.replaces.map(|id| id.to_string()))
    .bind(record.container_type.as_ref().map(|ct| ct.id))
    .bind(&record.author)
    .bind(&record.email)
    .bind(&record.title)
    .bind(&record.comment)
    .bind(&record.description)
    .bind(record.meta_timestamp.map(|ts| ts.to_rfc3339()))
    .bind(&record.doi)
    .bind(&record.license)
    .bind(record.size)
    .bind(&record.server_path)
    .execute(&mut *conn)
    .await?;

    save_links(conn, record).await
}

/// Update an existing full record in place. The owner column is left alone;
/// ownership is assigned on creation only.
pub async fn update_full(conn: &mut SqliteConnection, record: &DatasetRecord) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE datasets SET
            complete = ?, is_static = ?, created = ?, modified = ?,
            model_version = ?, hash = ?, replaces_id = ?, container_type_id = ?,
            author = ?, email = ?, title = ?, comment = ?, description = ?,
            meta_timestamp = ?, doi = ?, license = ?, size = ?, server_path = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(record.complete)
    .bind(record.is_static)
    .bind(record.created.map(|ts| ts.to_rfc3339()))
    .bind(record.modified.map(|ts| ts.to_rfc3339()))
    .bind(&record.model_version)
    .bind(&record.hash)
    .bind(record.replaces.map(|id| id.to_string()))
    .bind(record.container_type.as_ref().map(|ct| ct.id))
    .bind(&record.author)
    .bind(&record.email)
    .bind(&record.title)
    .bind(&record.comment)
    .bind(&record.description)
    .bind(record.meta_timestamp.map(|ts| ts.to_rfc3339()))
    .bind(&record.doi)
    .bind(&record.license)
    .bind(record.size)
    .bind(&record.server_path)
    .bind(record.id.to_string())
    .execute(&mut *conn)
    .await?;

    save_links(conn, record).await
}

/// Record the absolute storage path of the persisted container bytes
pub async fn set_server_path(conn: &mut SqliteConnection, id: Uuid, path: &str) -> Result<()> {
    sqlx::query("UPDATE datasets SET server_path = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(path)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Rewrite the keyword/file/software links for a record
async fn save_links(conn: &mut SqliteConnection, record: &DatasetRecord) -> Result<()> {
    let id = record.id.to_string();

    for table in ["dataset_keywords", "dataset_files", "dataset_software"] {
        sqlx::query(&format!("DELETE FROM {} WHERE dataset_id = ?", table))
            .bind(&id)
            .execute(&mut *conn)
            .await?;
    }

    // Distinct entities can resolve to the same deduplicated row (identical
    // embedded files, repeated software entries), so links must tolerate
    // repeats of the same id.
    for keyword in &record.keywords {
        sqlx::query("INSERT OR IGNORE INTO dataset_keywords (dataset_id, keyword_id) VALUES (?, ?)")
            .bind(&id)
            .bind(keyword.id)
            .execute(&mut *conn)
            .await?;
    }

    for (position, file) in record.files.iter().enumerate() {
        sqlx::query(
            "INSERT OR IGNORE INTO dataset_files (dataset_id, file_id, position) VALUES (?, ?, ?)",
        )
        .bind(&id)
        .bind(file.id)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }

    for (position, software) in record.used_software.iter().enumerate() {
        sqlx::query(
            "INSERT OR IGNORE INTO dataset_software (dataset_id, software_id, position) VALUES (?, ?, ?)",
        )
        .bind(&id)
        .bind(software.id)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Load a full record with all linked entities
pub async fn load_full(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<DatasetRecord>> {
    let row = sqlx::query("SELECT * FROM datasets WHERE id = ? AND is_placeholder = 0")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    let mut record = row_to_record(&row)?;

    if let Some(ct_id) = row.get::<Option<i64>, _>("container_type_id") {
        let ct_row = sqlx::query("SELECT name, type_id, version FROM container_types WHERE id = ?")
            .bind(ct_id)
            .fetch_one(&mut *conn)
            .await?;
        record.container_type = Some(ContainerType {
            id: ct_id,
            name: ct_row.get("name"),
            type_id: ct_row.get("type_id"),
            version: ct_row.get("version"),
        });
    }

    let keyword_rows = sqlx::query(
        r#"
        SELECT k.id, k.name FROM keywords k
        JOIN dataset_keywords dk ON dk.keyword_id = k.id
        WHERE dk.dataset_id = ?
        ORDER BY k.name
        "#,
    )
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    record.keywords = keyword_rows
        .iter()
        .map(|row| Keyword {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect();

    let file_rows = sqlx::query(
        r#"
        SELECT f.id, f.name, f.size, f.content FROM files f
        JOIN dataset_files df ON df.file_id = f.id
        WHERE df.dataset_id = ?
        ORDER BY df.position
        "#,
    )
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    record.files = file_rows
        .iter()
        .map(|row| {
            let content = row
                .get::<Option<String>, _>("content")
                .map(|text| serde_json::from_str(&text))
                .transpose()
                .map_err(|e| MetaDbError::Internal(format!("stored file content unreadable: {}", e)))?;
            Ok(EmbeddedFile {
                id: row.get("id"),
                name: row.get("name"),
                size: row.get("size"),
                content,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let software_rows = sqlx::query(
        r#"
        SELECT s.id, s.name, s.version, s.ident, s.id_type FROM software s
        JOIN dataset_software ds ON ds.software_id = s.id
        WHERE ds.dataset_id = ?
        ORDER BY ds.position
        "#,
    )
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    record.used_software = software_rows
        .iter()
        .map(|row| UsedSoftware {
            id: row.get("id"),
            name: row.get("name"),
            version: row.get("version"),
            ident: row.get("ident"),
            id_type: row.get("id_type"),
        })
        .collect();

    Ok(Some(record))
}

/// Number of dataset rows (any stage) stored for an id
pub async fn count_for_id(pool: &SqlitePool, id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM datasets WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn row_to_record(row: &SqliteRow) -> Result<DatasetRecord> {
    let id = parse_uuid(&row.get::<String, _>("id"))?;
    let replaces = row
        .get::<Option<String>, _>("replaces_id")
        .as_deref()
        .map(parse_uuid)
        .transpose()?;

    Ok(DatasetRecord {
        id,
        owner: row.get::<Option<String>, _>("owner").unwrap_or_default(),
        complete: row.get::<i64, _>("complete") != 0,
        is_static: row.get::<i64, _>("is_static") != 0,
        created: parse_opt_ts(row.get("created"))?,
        modified: parse_opt_ts(row.get("modified"))?,
        model_version: row.get("model_version"),
        hash: row.get("hash"),
        replaces,
        container_type: None,
        used_software: Vec::new(),
        author: row.get("author"),
        email: row.get("email"),
        title: row.get("title"),
        comment: row.get("comment"),
        description: row.get("description"),
        meta_timestamp: parse_opt_ts(row.get("meta_timestamp"))?,
        doi: row.get("doi"),
        license: row.get("license"),
        keywords: Vec::new(),
        files: Vec::new(),
        size: row.get("size"),
        server_path: row.get("server_path"),
    })
}

fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text)
        .map_err(|e| MetaDbError::Internal(format!("stored dataset id unreadable: {}", e)))
}

fn parse_opt_ts(text: Option<String>) -> Result<Option<DateTime<Utc>>> {
    text.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| MetaDbError::Internal(format!("stored timestamp unreadable: {}", e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_all_tables;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
        create_all_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn placeholder_roundtrip() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let id = Uuid::new_v4();

        let entry = get_or_create_placeholder(&mut conn, id).await.unwrap();
        assert!(matches!(entry, DatasetEntry::Placeholder(p) if p == id));

        // Second call reuses the row
        get_or_create_placeholder(&mut conn, id).await.unwrap();
        assert_eq!(count_for_id(&pool, id).await.unwrap(), 1);

        // A placeholder is never visible as a full record
        assert!(load_full(&mut conn, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_record_roundtrip() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let id = Uuid::new_v4();

        let mut record = DatasetRecord::new(id, "alice");
        record.title = Some("Scan 42".to_string());
        record.complete = true;
        record.created = Some(Utc::now());
        record.size = Some(1024);
        insert_full(&mut conn, &record).await.unwrap();

        let loaded = load_full(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(loaded.title.as_deref(), Some("Scan 42"));
        assert_eq!(loaded.owner, "alice");
        assert!(loaded.complete);
        assert_eq!(loaded.size, Some(1024));

        let entry = load_entry(&mut conn, id).await.unwrap().unwrap();
        assert!(matches!(entry, DatasetEntry::Full(_)));
    }

    #[tokio::test]
    async fn update_preserves_owner() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let id = Uuid::new_v4();

        let record = DatasetRecord::new(id, "alice");
        insert_full(&mut conn, &record).await.unwrap();

        let mut changed = load_full(&mut conn, id).await.unwrap().unwrap();
        changed.owner = "mallory".to_string();
        changed.title = Some("renamed".to_string());
        update_full(&mut conn, &changed).await.unwrap();

        let loaded = load_full(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(loaded.owner, "alice");
        assert_eq!(loaded.title.as_deref(), Some("renamed"));
    }

    #[tokio::test]
    async fn repeated_entity_links_are_collapsed() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let id = Uuid::new_v4();

        // Two archive members with identical name/size/content dedupe to one
        // files row, so the record carries the same file id twice.
        let file = crate::db::entities::get_or_create_file(&mut conn, "data.json", 12, None)
            .await
            .unwrap();

        let mut record = DatasetRecord::new(id, "alice");
        record.files = vec![file.clone(), file];
        insert_full(&mut conn, &record).await.unwrap();

        let loaded = load_full(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.files[0].name, "data.json");
    }
}
