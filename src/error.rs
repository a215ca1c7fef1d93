// src/error.rs
//! Public error type for the entire crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// No master key could be obtained for the caller
    #[error("encryption key unavailable")]
    KeyUnavailable,

    #[error("invalid master key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    EncryptionFailure(String),

    #[error("decryption failed: {0}")]
    DecryptionFailure(String),

    /// Every storage tier refused the operation
    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("batch {batch} of {collection} failed to commit: {reason}")]
    MigrationBatchFailure {
        collection: String,
        batch: usize,
        reason: String,
    },

    #[error("a migration is already running for uid {0}")]
    MigrationInProgress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
