// src/config/defaults.rs
use std::path::PathBuf;

use crate::config::app::{CollectionConfig, Keys, Paths};
use crate::consts::{
    BUG_REPORT_BATCH_SIZE, BUG_REPORT_COLLECTION, BUG_REPORT_FIELDS, DEFAULT_KEY_TTL_HOURS,
    JOURNAL_BATCH_SIZE, JOURNAL_COLLECTION, JOURNAL_FIELDS,
};

pub const DEFAULT_CONFIG_FILE: &str = "field-vault.toml";

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("field-vault"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_paths() -> Paths {
    let dir = data_dir();
    Paths {
        key_db: dir.join("keys.db"),
        document_db: dir.join("documents.db"),
    }
}

pub fn default_keys() -> Keys {
    Keys {
        ttl_hours: DEFAULT_KEY_TTL_HOURS,
    }
}

pub fn default_journal() -> CollectionConfig {
    collection(JOURNAL_COLLECTION, JOURNAL_FIELDS, JOURNAL_BATCH_SIZE)
}

pub fn default_bug_reports() -> CollectionConfig {
    collection(BUG_REPORT_COLLECTION, BUG_REPORT_FIELDS, BUG_REPORT_BATCH_SIZE)
}

fn collection(name: &str, fields: &[&str], batch_size: usize) -> CollectionConfig {
    CollectionConfig {
        collection: name.to_owned(),
        fields: fields.iter().map(|f| (*f).to_owned()).collect(),
        batch_size,
    }
}
