//! Configuration file and store selection

use crate::links::BacklinkConfig;
use crate::storage::{MemoryStore, OpenStore, PayloadStore, SqliteStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings read from `config.yaml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Turn on backlink scanning
    pub backlinks_enabled: bool,
    /// SQLite database file
    pub database: Option<PathBuf>,
}

impl Config {
    /// Read a config file. A missing or empty file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(default_db_path)
    }

    pub fn backlink_config(&self) -> BacklinkConfig {
        BacklinkConfig {
            enabled: self.backlinks_enabled,
        }
    }
}

fn data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("entrylinks")
}

/// Get the default database path (~/.local/share/entrylinks/entrylinks.db)
pub fn default_db_path() -> PathBuf {
    data_dir().join("entrylinks.db")
}

/// Get the default config path (~/.local/share/entrylinks/config.yaml)
pub fn default_config_path() -> PathBuf {
    data_dir().join("config.yaml")
}

/// Open the sqlite store at `path`, falling back to memory if it cannot be opened
pub fn open_store(path: &Path) -> Arc<dyn PayloadStore> {
    match SqliteStore::open(path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "no persistent store, links will not be saved");
            Arc::new(MemoryStore::new())
        }
    }
}
