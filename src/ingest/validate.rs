//! Section field validation
//!
//! Applies a resolved constraint set to one raw metadata section: checks
//! required fields, coerces present values, and emits them under their
//! canonical names. Unknown fields are ignored so older servers keep
//! accepting containers that carry future fields.

use crate::ingest::coerce::coerce_value;
use crate::ingest::constraints::FieldSpec;
use crate::models::FieldValue;
use crate::{MetaDbError, Result};
use serde_json::{Map, Value};
use sqlx::SqliteConnection;

/// Validate one section (`content` or `meta`) against its field specs.
///
/// Returns (canonical name, coerced value) pairs in spec order. Optional
/// fields that are absent or empty are omitted; no defaults are substituted.
pub async fn validate_section(
    section: &str,
    raw: &Map<String, Value>,
    specs: &'static [FieldSpec],
    conn: &mut SqliteConnection,
) -> Result<Vec<(&'static str, FieldValue)>> {
    let mut validated = Vec::new();

    for spec in specs {
        let value = raw.get(spec.external);

        if spec.required && value.is_none() {
            return Err(MetaDbError::MissingField {
                field: spec.external.to_string(),
                section: section.to_string(),
            });
        }

        if let Some(value) = value {
            if is_empty(value) {
                continue;
            }
            let coerced = coerce_value(spec, value, conn).await?;
            validated.push((spec.canonical, coerced));
        }
    }

    Ok(validated)
}

/// Null, empty string, empty array, empty object. `false` and `0` are
/// real values, not emptiness.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
