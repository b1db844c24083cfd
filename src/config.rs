//! Configuration loading for the catalog
//!
//! Resolution priority per setting: environment variable, then TOML config
//! file, then compiled default.

use crate::{MetaDbError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Catalog configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Directory receiving the raw bytes of accepted containers
    pub storage_root: PathBuf,

    /// SQLite database file path
    pub database_path: PathBuf,

    /// Honor the reserved all-zero test-UUID prefix (fixture routing).
    /// With this off, such identifiers are treated as ordinary datasets.
    #[serde(default = "default_test_fixtures")]
    pub test_fixtures_enabled: bool,
}

fn default_test_fixtures() -> bool {
    true
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./sdc_data/media"),
            database_path: PathBuf::from("./sdc_data/catalog.db"),
            test_fixtures_enabled: true,
        }
    }
}

impl CatalogConfig {
    /// Load configuration, applying env-var overrides on top of an optional
    /// TOML file.
    ///
    /// Recognized variables: `SDC_STORAGE_ROOT`, `SDC_DATABASE_PATH`,
    /// `SDC_TEST_FIXTURES` (`0`/`false` to disable).
    pub fn load(toml_path: Option<&Path>) -> Result<Self> {
        let mut config = match toml_path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| MetaDbError::Config(format!("Read TOML failed: {}", e)))?;
                let config: CatalogConfig = toml::from_str(&content)
                    .map_err(|e| MetaDbError::Config(format!("Parse TOML failed: {}", e)))?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            _ => CatalogConfig::default(),
        };

        if let Ok(root) = std::env::var("SDC_STORAGE_ROOT") {
            config.storage_root = PathBuf::from(root);
        }
        if let Ok(db) = std::env::var("SDC_DATABASE_PATH") {
            config.database_path = PathBuf::from(db);
        }
        if let Ok(flag) = std::env::var("SDC_TEST_FIXTURES") {
            config.test_fixtures_enabled = !matches!(flag.as_str(), "0" | "false" | "off");
        }

        Ok(config)
    }
}
