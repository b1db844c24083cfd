//! Get-or-create operations for deduplicated side entities
//!
//! Every lookup matches the entity's full identity tuple; nullable columns
//! are compared with `IS ?` so two NULLs count as equal.

use crate::models::{ContainerType, EmbeddedFile, Keyword, UsedSoftware};
use crate::Result;
use sqlx::{Row, SqliteConnection};

pub async fn get_or_create_keyword(conn: &mut SqliteConnection, name: &str) -> Result<Keyword> {
    let existing = sqlx::query("SELECT id FROM keywords WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    let id = match existing {
        Some(row) => row.get::<i64, _>("id"),
        None => sqlx::query("INSERT INTO keywords (name) VALUES (?)")
            .bind(name)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid(),
    };

    Ok(Keyword {
        id,
        name: name.to_string(),
    })
}

pub async fn get_or_create_file(
    conn: &mut SqliteConnection,
    name: &str,
    size: i64,
    content: Option<&serde_json::Value>,
) -> Result<EmbeddedFile> {
    let content_text = content.map(|v| v.to_string());

    let existing = sqlx::query("SELECT id FROM files WHERE name = ? AND size = ? AND content IS ?")
        .bind(name)
        .bind(size)
        .bind(&content_text)
        .fetch_optional(&mut *conn)
        .await?;

    let id = match existing {
        Some(row) => row.get::<i64, _>("id"),
        None => sqlx::query("INSERT INTO files (name, size, content) VALUES (?, ?, ?)")
            .bind(name)
            .bind(size)
            .bind(&content_text)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid(),
    };

    Ok(EmbeddedFile {
        id,
        name: name.to_string(),
        size,
        content: content.cloned(),
    })
}

pub async fn get_or_create_software(
    conn: &mut SqliteConnection,
    software: &UsedSoftware,
) -> Result<UsedSoftware> {
    let existing = sqlx::query(
        "SELECT id FROM software \
         WHERE name = ? AND version IS ? AND ident IS ? AND id_type IS ?",
    )
    .bind(&software.name)
    .bind(&software.version)
    .bind(&software.ident)
    .bind(&software.id_type)
    .fetch_optional(&mut *conn)
    .await?;

    let id = match existing {
        Some(row) => row.get::<i64, _>("id"),
        None => sqlx::query("INSERT INTO software (name, version, ident, id_type) VALUES (?, ?, ?, ?)")
            .bind(&software.name)
            .bind(&software.version)
            .bind(&software.ident)
            .bind(&software.id_type)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid(),
    };

    Ok(UsedSoftware {
        id,
        ..software.clone()
    })
}

pub async fn get_or_create_container_type(
    conn: &mut SqliteConnection,
    container_type: &ContainerType,
) -> Result<ContainerType> {
    let existing = sqlx::query(
        "SELECT id FROM container_types WHERE name = ? AND type_id IS ? AND version IS ?",
    )
    .bind(&container_type.name)
    .bind(&container_type.type_id)
    .bind(&container_type.version)
    .fetch_optional(&mut *conn)
    .await?;

    let id = match existing {
        Some(row) => row.get::<i64, _>("id"),
        None => sqlx::query("INSERT INTO container_types (name, type_id, version) VALUES (?, ?, ?)")
            .bind(&container_type.name)
            .bind(&container_type.type_id)
            .bind(&container_type.version)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid(),
    };

    Ok(ContainerType {
        id,
        ..container_type.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_all_tables;
    use sqlx::SqlitePool;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        create_all_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn keywords_are_uniqued_by_name() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = get_or_create_keyword(&mut conn, "holography").await.unwrap();
        let second = get_or_create_keyword(&mut conn, "holography").await.unwrap();
        assert_eq!(first.id, second.id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keywords")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn files_dedupe_on_name_size_content() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let a = get_or_create_file(&mut conn, "data.bin", 128, None).await.unwrap();
        let b = get_or_create_file(&mut conn, "data.bin", 128, None).await.unwrap();
        assert_eq!(a.id, b.id);

        // Same name, different size: distinct row
        let c = get_or_create_file(&mut conn, "data.bin", 256, None).await.unwrap();
        assert_ne!(a.id, c.id);

        let content = serde_json::json!({"k": 1});
        let d = get_or_create_file(&mut conn, "data.json", 8, Some(&content)).await.unwrap();
        let e = get_or_create_file(&mut conn, "data.json", 8, Some(&content)).await.unwrap();
        assert_eq!(d.id, e.id);
    }

    #[tokio::test]
    async fn container_types_with_null_fields_dedupe() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let ct = ContainerType {
            id: 0,
            name: "myRawData".to_string(),
            type_id: None,
            version: Some("1.1".to_string()),
        };
        let a = get_or_create_container_type(&mut conn, &ct).await.unwrap();
        let b = get_or_create_container_type(&mut conn, &ct).await.unwrap();
        assert_eq!(a.id, b.id);
    }
}
