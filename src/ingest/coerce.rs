//! Value coercers
//!
//! Convert raw JSON values from the metadata sections into typed domain
//! values. Coercers that resolve against the catalog (cross-references,
//! keywords, software, container types) run on the ambient ingestion
//! transaction, so everything they create rolls back with a failed upload.

use crate::db;
use crate::ingest::constraints::{CoercerKind, FieldSpec};
use crate::models::{ContainerType, FieldValue, UsedSoftware};
use crate::{MetaDbError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Apply a field's coercer to its raw value
pub async fn coerce_value(
    spec: &FieldSpec,
    value: &Value,
    conn: &mut SqliteConnection,
) -> Result<FieldValue> {
    match spec.kind {
        CoercerKind::Str => value
            .as_str()
            .map(|s| FieldValue::Text(s.to_string()))
            .ok_or_else(|| invalid(spec, value, "expected a string")),

        CoercerKind::Bool => value
            .as_bool()
            .map(FieldValue::Flag)
            .ok_or_else(|| invalid(spec, value, "expected a boolean")),

        CoercerKind::Timestamp => {
            let raw = value
                .as_str()
                .ok_or_else(|| invalid(spec, value, "expected a timestamp string"))?;
            parse_timestamp(raw)
                .map(FieldValue::Timestamp)
                .ok_or_else(|| invalid(spec, value, "not a recognized timestamp format"))
        }

        CoercerKind::CrossRef => {
            let raw = value
                .as_str()
                .ok_or_else(|| invalid(spec, value, "expected a UUID string"))?;
            let id = Uuid::parse_str(raw)
                .map_err(|_| invalid(spec, value, "not a well-formed UUID"))?;
            let entry = db::datasets::get_or_create_placeholder(conn, id).await?;
            Ok(FieldValue::CrossRef(entry.id()))
        }

        CoercerKind::SoftwareList => {
            let entries = value
                .as_array()
                .ok_or_else(|| invalid(spec, value, "expected a list of software entries"))?;
            let mut resolved = Vec::with_capacity(entries.len());
            for entry in entries {
                let software: UsedSoftware = serde_json::from_value(entry.clone())
                    .map_err(|e| invalid(spec, entry, &e.to_string()))?;
                resolved.push(db::entities::get_or_create_software(conn, &software).await?);
            }
            Ok(FieldValue::Software(resolved))
        }

        CoercerKind::ContainerTypeInfo => {
            let container_type: ContainerType = serde_json::from_value(value.clone())
                .map_err(|e| invalid(spec, value, &e.to_string()))?;
            let resolved = db::entities::get_or_create_container_type(conn, &container_type).await?;
            Ok(FieldValue::Container(resolved))
        }

        CoercerKind::KeywordList => {
            let entries = value
                .as_array()
                .ok_or_else(|| invalid(spec, value, "expected a list of keyword strings"))?;
            let mut resolved = Vec::new();
            for entry in entries {
                let name = entry
                    .as_str()
                    .ok_or_else(|| invalid(spec, entry, "expected a keyword string"))?;
                let keyword = db::entities::get_or_create_keyword(conn, name).await?;
                if !resolved.contains(&keyword) {
                    resolved.push(keyword);
                }
            }
            Ok(FieldValue::Keywords(resolved))
        }
    }
}

/// Parse a timestamp string, trying exactly three formats in order:
/// ISO 8601, then `%Y-%m-%dT%H:%M:%S` with an explicit numeric UTC offset,
/// then `%Y-%m-%d %H:%M:%S` with a trailing timezone abbreviation. Both
/// fallback formats treat the wall-clock time as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_iso8601(raw)
        .or_else(|| parse_explicit_offset(raw))
        .or_else(|| parse_named_zone(raw))
}

fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // ISO 8601 without an offset (naive), taken as UTC
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_explicit_offset(raw: &str) -> Option<DateTime<Utc>> {
    // Accepts compact offsets like +0000 that strict RFC 3339 parsing
    // rejects; the offset is then discarded and the time read as UTC.
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .ok()
        .map(|ts| ts.naive_local().and_utc())
}

fn parse_named_zone(raw: &str) -> Option<DateTime<Utc>> {
    let (head, zone) = raw.rsplit_once(' ')?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn invalid(spec: &FieldSpec, value: &Value, detail: &str) -> MetaDbError {
    MetaDbError::InvalidFieldValue {
        field: spec.external.to_string(),
        value: value.to_string(),
        detail: detail.to_string(),
    }
}
