//! Domain models for the catalog

pub mod dataset;
pub mod entities;

pub use dataset::{DatasetAttributes, DatasetEntry, DatasetRecord, FieldValue};
pub use entities::{ContainerType, EmbeddedFile, Keyword, UsedSoftware};
