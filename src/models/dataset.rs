//! Dataset records and their two lifecycle stages
//!
//! An identifier is represented either by a placeholder (created only as a
//! cross-reference target) or by a full record, never both. Promotion from
//! placeholder to full record is an explicit delete-then-insert performed by
//! the ingestion pipeline inside its transaction.

use crate::models::{ContainerType, EmbeddedFile, Keyword, UsedSoftware};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored dataset identifier, at either lifecycle stage
#[derive(Debug, Clone)]
pub enum DatasetEntry {
    /// Known only by id, referenced by another record's `replaces`
    Placeholder(Uuid),
    /// Fully ingested record
    Full(DatasetRecord),
}

impl DatasetEntry {
    pub fn id(&self) -> Uuid {
        match self {
            DatasetEntry::Placeholder(id) => *id,
            DatasetEntry::Full(record) => record.id,
        }
    }
}

/// Fully validated dataset record
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    pub id: Uuid,
    /// Authenticated principal that first uploaded the dataset; never
    /// reassigned on update
    pub owner: String,
    pub complete: bool,
    pub is_static: bool,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub model_version: Option<String>,
    pub hash: Option<String>,
    /// Identifier of the dataset this one replaces (may point at a placeholder)
    pub replaces: Option<Uuid>,
    pub container_type: Option<ContainerType>,
    pub used_software: Vec<UsedSoftware>,
    pub author: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    /// Free-form timestamp from meta.json (model version >= 0.5.1)
    pub meta_timestamp: Option<DateTime<Utc>>,
    pub doi: Option<String>,
    pub license: Option<String>,
    pub keywords: Vec<Keyword>,
    /// Members of the uploaded archive, in archive order
    pub files: Vec<EmbeddedFile>,
    /// Upload size in bytes
    pub size: Option<i64>,
    /// Absolute path of the persisted container file
    pub server_path: Option<String>,
}

impl DatasetRecord {
    /// Fresh record for a first-time ingestion. Completeness stays false
    /// until the validated `complete` attribute is applied.
    pub fn new(id: Uuid, owner: &str) -> Self {
        Self {
            id,
            owner: owner.to_string(),
            complete: false,
            is_static: false,
            created: None,
            modified: None,
            model_version: None,
            hash: None,
            replaces: None,
            container_type: None,
            used_software: Vec::new(),
            author: None,
            email: None,
            title: None,
            comment: None,
            description: None,
            meta_timestamp: None,
            doi: None,
            license: None,
            keywords: Vec::new(),
            files: Vec::new(),
            size: None,
            server_path: None,
        }
    }
}

/// One validated, coerced field value under its canonical name
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Timestamp(DateTime<Utc>),
    /// Resolved cross-reference (full record or placeholder) by id
    CrossRef(Uuid),
    Software(Vec<UsedSoftware>),
    Container(ContainerType),
    Keywords(Vec<Keyword>),
}

/// Validated output of one ingestion: section fields plus computed attributes
#[derive(Debug, Clone, Default)]
pub struct DatasetAttributes {
    /// (canonical name, value) pairs from both validated sections
    pub fields: Vec<(&'static str, FieldValue)>,
    /// Upload size in bytes
    pub size: i64,
    /// Archive members, in archive order
    pub files: Vec<EmbeddedFile>,
}

impl DatasetAttributes {
    /// Look up a validated field by canonical name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Merge the validated values into a record, field by field. Fields not
    /// present in this upload keep their stored values; `uuid` is identity,
    /// not an attribute, and is skipped.
    pub fn apply_to(&self, record: &mut DatasetRecord) {
        for (name, value) in &self.fields {
            match (*name, value) {
                ("uuid", _) => {}
                ("replaces", FieldValue::CrossRef(id)) => record.replaces = Some(*id),
                ("container_type", FieldValue::Container(ct)) => {
                    record.container_type = Some(ct.clone())
                }
                ("created", FieldValue::Timestamp(ts)) => record.created = Some(*ts),
                ("modified", FieldValue::Timestamp(ts)) => record.modified = Some(*ts),
                ("static", FieldValue::Flag(b)) => record.is_static = *b,
                ("complete", FieldValue::Flag(b)) => record.complete = *b,
                ("hash", FieldValue::Text(s)) => record.hash = Some(s.clone()),
                ("used_software", FieldValue::Software(list)) => {
                    record.used_software = list.clone()
                }
                ("model_version", FieldValue::Text(s)) => record.model_version = Some(s.clone()),
                ("author", FieldValue::Text(s)) => record.author = Some(s.clone()),
                ("email", FieldValue::Text(s)) => record.email = Some(s.clone()),
                ("comment", FieldValue::Text(s)) => record.comment = Some(s.clone()),
                ("title", FieldValue::Text(s)) => record.title = Some(s.clone()),
                ("keywords", FieldValue::Keywords(list)) => record.keywords = list.clone(),
                ("description", FieldValue::Text(s)) => record.description = Some(s.clone()),
                ("timestamp", FieldValue::Timestamp(ts)) => record.meta_timestamp = Some(*ts),
                ("doi", FieldValue::Text(s)) => record.doi = Some(s.clone()),
                ("license", FieldValue::Text(s)) => record.license = Some(s.clone()),
                (name, value) => {
                    // Table entries and match arms are maintained together;
                    // a mismatch here is a programming error worth surfacing
                    // in logs rather than silently dropping data.
                    tracing::warn!("Unhandled validated attribute {}: {:?}", name, value);
                }
            }
        }
        record.size = Some(self.size);
        record.files = self.files.clone();
    }
}
