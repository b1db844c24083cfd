//! Container ingestion pipeline
//!
//! End-to-end flow for one upload: sniff the format, extract the metadata
//! sections and file manifest, resolve the declared schema version, validate
//! both sections, reconcile with any stored record for the same identifier,
//! and persist the raw container bytes. Every database mutation for one
//! upload happens inside a single transaction; any failure rolls the whole
//! ingestion back.

pub mod coerce;
pub mod constraints;
pub mod extract;
pub mod fixtures;
pub mod upload;
pub mod validate;
pub mod version;

pub use constraints::{resolve_constraints, ConstraintSet};
pub use extract::{ContainerFormat, Extractor};
pub use upload::Upload;
pub use version::ModelVersion;

use crate::config::CatalogConfig;
use crate::db;
use crate::models::{DatasetAttributes, DatasetEntry, DatasetRecord, FieldValue};
use crate::{MetaDbError, Result};
use extract::{FileEntry, Hdf5Extractor, ZipExtractor};
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Ingest one uploaded container for an authenticated owner.
///
/// Returns the persisted record, or `None` when the upload declared a
/// reserved test identifier and fixture routing is enabled. All store
/// mutations run in one transaction; the raw bytes are written to storage
/// last, once the record is otherwise complete.
pub async fn ingest_container<R: Read + Seek>(
    pool: &SqlitePool,
    config: &CatalogConfig,
    upload: &mut Upload<R>,
    owner: &str,
) -> Result<Option<DatasetRecord>> {
    let head = upload.sniff_head()?;
    let format = extract::sniff_format(&head)?;

    let mut tx = pool.begin().await?;
    match run_pipeline(&mut tx, config, upload, owner, format).await {
        Ok(Some(record)) => {
            tx.commit().await?;
            info!("Ingested dataset {}", record.id);
            Ok(Some(record))
        }
        Ok(None) => {
            // Fixture uploads leave no trace, including side entities
            // created while validating them.
            tx.rollback().await?;
            Ok(None)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(err.into_taxonomy())
        }
    }
}

async fn run_pipeline<R: Read + Seek>(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    config: &CatalogConfig,
    upload: &mut Upload<R>,
    owner: &str,
    format: ContainerFormat,
) -> Result<Option<DatasetRecord>> {
    let size = upload.size() as i64;

    let (content, meta, filelist) = match format {
        ContainerFormat::Zip => {
            let reader = upload.rewind()?;
            let mut extractor = ZipExtractor::open(reader)?;
            extract_all(&mut extractor)?
        }
        ContainerFormat::Hdf5 => extract_all(&mut Hdf5Extractor)?,
    };

    let conn: &mut SqliteConnection = &mut *tx;

    let declared = content
        .get("modelVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MetaDbError::MissingField {
            field: "modelVersion".to_string(),
            section: "content".to_string(),
        })?;
    let constraints = resolve_constraints(declared)?;

    let mut fields = validate::validate_section("content", &content, constraints.content, conn).await?;
    fields.extend(validate::validate_section("meta", &meta, constraints.meta, conn).await?);

    let mut files = Vec::with_capacity(filelist.len());
    for entry in &filelist {
        files.push(
            db::entities::get_or_create_file(conn, &entry.name, entry.size, entry.content.as_ref())
                .await?,
        );
    }

    let attrs = DatasetAttributes { fields, size, files };

    let id = validated_id(&attrs)?;

    if config.test_fixtures_enabled && fixtures::is_test_uuid(&id) {
        return Ok(fixtures::resolve_test_fixture(&id));
    }

    match db::datasets::load_entry(conn, id).await? {
        Some(DatasetEntry::Placeholder(_)) => {
            // Previously known by id only; promote to a full record
            db::datasets::delete_dataset(conn, id).await?;
            let mut record = DatasetRecord::new(id, owner);
            attrs.apply_to(&mut record);
            db::datasets::insert_full(conn, &record).await?;
            info!("Promoted placeholder {} to full dataset", id);
        }
        Some(DatasetEntry::Full(mut existing)) => {
            attrs.apply_to(&mut existing);
            db::datasets::update_full(conn, &existing).await?;
            info!("Updated existing dataset {}", id);
        }
        None => {
            let mut record = DatasetRecord::new(id, owner);
            attrs.apply_to(&mut record);
            db::datasets::insert_full(conn, &record).await?;
            info!("Created dataset {}", id);
        }
    }

    let stored = persist_raw_bytes(conn, config, upload, id, format).await?;

    // Hand back exactly what a later read will see
    let reloaded = db::datasets::load_full(conn, id).await.and_then(|found| {
        found.ok_or_else(|| {
            MetaDbError::Internal(format!("dataset {} vanished inside its own transaction", id))
        })
    });
    match reloaded {
        Ok(record) => Ok(Some(record)),
        Err(err) => {
            // The transaction will roll back; storage must not keep the file.
            let _ = std::fs::remove_file(&stored);
            Err(err)
        }
    }
}

/// Write the container bytes to durable storage and record the path.
///
/// Returns the path of the stored file. If anything fails once the file
/// exists, it is removed before the error propagates, so a rolled-back
/// ingestion leaves no stray container behind.
async fn persist_raw_bytes<R: Read + Seek>(
    conn: &mut SqliteConnection,
    config: &CatalogConfig,
    upload: &mut Upload<R>,
    id: Uuid,
    format: ContainerFormat,
) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.storage_root)?;
    let path = config
        .storage_root
        .join(format!("{}.{}", id, format.extension()));

    if let Err(err) = write_and_record(conn, upload, id, &path).await {
        let _ = std::fs::remove_file(&path);
        return Err(err);
    }
    Ok(path)
}

async fn write_and_record<R: Read + Seek>(
    conn: &mut SqliteConnection,
    upload: &mut Upload<R>,
    id: Uuid,
    path: &Path,
) -> Result<()> {
    let mut dest = std::fs::File::create(path)?;
    upload.copy_to(&mut dest)?;

    let absolute = std::fs::canonicalize(path)?;
    let server_path = absolute.to_string_lossy().to_string();
    db::datasets::set_server_path(conn, id, &server_path).await?;
    Ok(())
}

/// Sections first, manifest last: an extractor that cannot produce the
/// metadata sections never gets asked for its file manifest.
fn extract_all<E: Extractor>(
    extractor: &mut E,
) -> Result<(Map<String, Value>, Map<String, Value>, Vec<FileEntry>)> {
    let content = extractor.read_content()?;
    let meta = extractor.read_meta()?;
    let filelist = extractor.read_filelist()?;
    Ok((content, meta, filelist))
}

fn validated_id(attrs: &DatasetAttributes) -> Result<Uuid> {
    let text = match attrs.get("uuid") {
        Some(FieldValue::Text(text)) => text,
        _ => {
            return Err(MetaDbError::MissingField {
                field: "uuid".to_string(),
                section: "content".to_string(),
            })
        }
    };
    Uuid::parse_str(text).map_err(|_| MetaDbError::InvalidFieldValue {
        field: "uuid".to_string(),
        value: text.clone(),
        detail: "not a well-formed UUID".to_string(),
    })
}
