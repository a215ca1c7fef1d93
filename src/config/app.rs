// src/config/app.rs
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::defaults::*;
use crate::collection::CollectionSpec;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_paths")]
    pub paths: Paths,
    #[serde(default = "default_keys")]
    pub keys: Keys,
    #[serde(default = "default_journal")]
    pub journal: CollectionConfig,
    #[serde(default = "default_bug_reports")]
    pub bug_reports: CollectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub key_db: PathBuf,
    pub document_db: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keys {
    /// Lifetime of a durable key record
    pub ttl_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub collection: String,
    pub fields: Vec<String>,
    pub batch_size: usize,
}

impl CollectionConfig {
    pub fn to_spec(&self) -> CollectionSpec {
        CollectionSpec::new(&self.collection, self.fields.as_slice(), self.batch_size)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: default_paths(),
            keys: default_keys(),
            journal: default_journal(),
            bug_reports: default_bug_reports(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// `FV_KEY_DB` / `FV_DOCUMENT_DB` win over the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FV_KEY_DB") {
            self.paths.key_db = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("FV_DOCUMENT_DB") {
            self.paths.document_db = PathBuf::from(path);
        }
    }

    pub fn journal_spec(&self) -> CollectionSpec {
        self.journal.to_spec()
    }

    pub fn bug_report_spec(&self) -> CollectionSpec {
        self.bug_reports.to_spec()
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Global config from `$FV_CONFIG` or `field-vault.toml`, else built-in defaults
pub fn load() -> &'static Config {
    CONFIG.get_or_init(|| {
        let config_path =
            std::env::var("FV_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut conf = if Path::new(&config_path).exists() {
            Config::from_file(&config_path).unwrap_or_else(|e| {
                warn!(path = %config_path, error = %e, "unreadable config, using built-in defaults");
                Config::default()
            })
        } else {
            warn!(path = %config_path, "config not found, using built-in defaults");
            Config::default()
        };

        conf.apply_env_overrides();
        conf
    })
}
