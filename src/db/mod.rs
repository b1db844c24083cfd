//! Database access for the catalog

pub mod datasets;
pub mod entities;
pub mod init;

pub use init::{create_all_tables, init_database};
