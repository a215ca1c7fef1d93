// src/lib.rs
//! field-vault: per-user master keys and field-level encryption
//!
//! Features:
//! - AES-256-GCM envelopes (`base64(IV || ciphertext)`)
//! - Three-tier key cache: process memory, session, durable SQLite
//! - Compare-and-set key creation (one key per uid)
//! - Resumable, batch-atomic migration of plaintext records
//! - Full secure-gate integration for key material

pub mod aliases;
pub mod collection;
pub mod config;
pub mod consts;
pub mod crypto;
pub mod db;
pub mod enums;
pub mod error;
pub mod key_manager;
pub mod key_ops;
pub mod key_store;
pub mod migration;
pub mod records;
pub mod session;
pub mod store;
pub mod util;

// Re-export everything users need at the crate root
pub use collection::CollectionSpec;
pub use config::load as load_config;
pub use error::{CoreError, Result as CoreResult};
pub use key_manager::{KeyCache, KeyManager};
pub use key_ops::{generate_key, MasterKey};
pub use key_store::{KeyBackend, KeyStore, SqliteKeyBackend};
pub use migration::{MigrationEngine, MigrationResult, MigrationStatus, MigrationSummary};
pub use records::EncryptedRecords;
pub use session::{MemorySessionStorage, SessionCache, SessionStorage};
pub use store::{Document, DocumentStore, Filter, MemoryDocumentStore, SqliteDocumentStore};
