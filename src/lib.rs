//! # Scientific data container catalog
//!
//! Metadata catalog core for self-describing scientific data containers:
//! uploaded archives bundle a data payload plus two JSON descriptors
//! (`content.json`, `meta.json`). The crate extracts and validates both
//! descriptors against the schema version the container declares, resolves
//! cross-references to other stored datasets, reconciles the result with any
//! existing record for the same identifier, and persists the raw container
//! bytes.
//!
//! The web layer and authentication live elsewhere; callers hand
//! [`ingest::ingest_container`] an opened upload stream and an authenticated
//! principal.

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;

pub use config::CatalogConfig;
pub use error::{MetaDbError, Result};
pub use ingest::{ingest_container, Upload};
pub use models::{DatasetEntry, DatasetRecord};
