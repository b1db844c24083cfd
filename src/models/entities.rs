//! Catalog side entities referenced by dataset records
//!
//! All four are deduplicated in the store: identical rows are reused across
//! uploads via get-or-create lookups keyed on their identity tuple.

use serde::{Deserialize, Serialize};

/// One member of an uploaded container archive.
///
/// Identity is the (name, size, content) tuple; JSON members additionally
/// carry their parsed content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedFile {
    /// Row id (0 until stored)
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub size: i64,
    pub content: Option<serde_json::Value>,
}

/// Free-text tag, uniqued by name across the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
}

/// Tooling that produced a dataset, parsed from `usedSoftware` in content.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedSoftware {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub version: Option<String>,
    /// External identifier, e.g. a homepage or registry URL
    #[serde(rename = "id")]
    pub ident: Option<String>,
    #[serde(rename = "idType")]
    pub id_type: Option<String>,
}

/// Container type/version declaration from content.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerType {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    /// External identifier of the type definition, if any
    #[serde(rename = "id")]
    pub type_id: Option<String>,
    pub version: Option<String>,
}
