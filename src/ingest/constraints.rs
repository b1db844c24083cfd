//! Per-version field constraint table and resolver
//!
//! Each supported model version maps the fields of `content.json` and
//! `meta.json` to a coercer kind and a required flag. The table is ordered
//! oldest-first and additive: a newer entry repeats every field of the older
//! ones and may add fields, so the resolver always applies exactly one
//! entry. Canonical snake_case names are fixed here at table-definition
//! time; nothing converts names at runtime.

use crate::ingest::version::ModelVersion;
use crate::{MetaDbError, Result};
use once_cell::sync::Lazy;

/// How a raw JSON value is converted to a typed domain value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercerKind {
    /// JSON string passthrough
    Str,
    /// JSON bool passthrough
    Bool,
    /// ISO-8601 (with fallbacks) to a UTC timestamp
    Timestamp,
    /// UUID of another dataset; resolves to a stored record or placeholder
    CrossRef,
    /// List of software-description objects
    SoftwareList,
    /// Container type/version object
    ContainerTypeInfo,
    /// List of tag strings, deduplicated catalog-wide
    KeywordList,
}

/// One field contract: external JSON name, precomputed canonical name,
/// coercer, required flag
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub external: &'static str,
    pub canonical: &'static str,
    pub kind: CoercerKind,
    pub required: bool,
}

const fn field(
    external: &'static str,
    canonical: &'static str,
    kind: CoercerKind,
    required: bool,
) -> FieldSpec {
    FieldSpec {
        external,
        canonical,
        kind,
        required,
    }
}

/// Field contracts for both metadata sections of one model version
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    pub content: &'static [FieldSpec],
    pub meta: &'static [FieldSpec],
}

const CONTENT_0_3: &[FieldSpec] = &[
    field("uuid", "uuid", CoercerKind::Str, true),
    field("replaces", "replaces", CoercerKind::CrossRef, false),
    field("containerType", "container_type", CoercerKind::ContainerTypeInfo, true),
    field("created", "created", CoercerKind::Timestamp, true),
    field("modified", "modified", CoercerKind::Timestamp, true),
    field("static", "static", CoercerKind::Bool, true),
    field("complete", "complete", CoercerKind::Bool, true),
    field("hash", "hash", CoercerKind::Str, false),
    field("usedSoftware", "used_software", CoercerKind::SoftwareList, false),
    field("modelVersion", "model_version", CoercerKind::Str, true),
];

const META_0_3: &[FieldSpec] = &[
    field("author", "author", CoercerKind::Str, true),
    field("email", "email", CoercerKind::Str, true),
    field("comment", "comment", CoercerKind::Str, false),
    field("title", "title", CoercerKind::Str, true),
    field("keywords", "keywords", CoercerKind::KeywordList, false),
    field("description", "description", CoercerKind::Str, false),
];

// 0.5.1 carries 0.3's content section unchanged and extends meta
const META_0_5_1: &[FieldSpec] = &[
    field("author", "author", CoercerKind::Str, true),
    field("email", "email", CoercerKind::Str, true),
    field("comment", "comment", CoercerKind::Str, false),
    field("title", "title", CoercerKind::Str, true),
    field("keywords", "keywords", CoercerKind::KeywordList, false),
    field("description", "description", CoercerKind::Str, false),
    field("timestamp", "timestamp", CoercerKind::Timestamp, false),
    field("doi", "doi", CoercerKind::Str, false),
    field("license", "license", CoercerKind::Str, false),
];

/// Supported versions, oldest first
static CONSTRAINT_TABLE: Lazy<Vec<(ModelVersion, ConstraintSet)>> = Lazy::new(|| {
    vec![
        (
            "0.3".parse().expect("static version"),
            ConstraintSet {
                content: CONTENT_0_3,
                meta: META_0_3,
            },
        ),
        (
            "0.5.1".parse().expect("static version"),
            ConstraintSet {
                content: CONTENT_0_3,
                meta: META_0_5_1,
            },
        ),
    ]
});

/// Oldest version the catalog accepts
pub fn min_supported_version() -> &'static ModelVersion {
    &CONSTRAINT_TABLE[0].0
}

/// Select the constraint set for a declared version string.
///
/// Picks the newest table entry not newer than the declared version; a
/// declaration beyond the newest entry gets the newest entry (best effort
/// forward compatibility). Versions below the minimum are rejected.
pub fn resolve_constraints(declared: &str) -> Result<&'static ConstraintSet> {
    let version: ModelVersion = declared.parse().map_err(|_| MetaDbError::InvalidFieldValue {
        field: "modelVersion".to_string(),
        value: declared.to_string(),
        detail: "not a dotted numeric version".to_string(),
    })?;

    if version < *min_supported_version() {
        return Err(MetaDbError::VersionTooOld {
            declared: declared.to_string(),
            minimum: min_supported_version().to_string(),
        });
    }

    let set = CONSTRAINT_TABLE
        .iter()
        .rev()
        .find(|(table_version, _)| *table_version <= version)
        .map(|(_, set)| set)
        .expect("version >= minimum always matches the first entry");

    Ok(set)
}
