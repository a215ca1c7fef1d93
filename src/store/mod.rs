// src/store/mod.rs
//! Document-store abstraction consumed by the migration engine
//!
//! The engine only needs equality queries on owner and encrypted flag,
//! get/update by id, and an atomic multi-document commit.
mod memory;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{ENCRYPTED_FIELD, UID_FIELD};
use crate::crypto::Fields;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn uid(&self) -> Option<&str> {
        self.fields.get(UID_FIELD).and_then(Value::as_str)
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self.fields.get(ENCRYPTED_FIELD), Some(Value::Bool(true)))
    }
}

/// Owner match, optionally excluding records already marked encrypted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub uid: String,
    pub exclude_encrypted: bool,
}

impl Filter {
    pub fn owned_by(uid: &str) -> Self {
        Self {
            uid: uid.to_owned(),
            exclude_encrypted: false,
        }
    }

    /// `encrypted` absent OR not `true`; a missing flag counts as plaintext
    pub fn unencrypted(uid: &str) -> Self {
        Self {
            uid: uid.to_owned(),
            exclude_encrypted: true,
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.uid() == Some(self.uid.as_str())
            && !(self.exclude_encrypted && document.is_encrypted())
    }
}

pub trait DocumentStore: Send + Sync {
    /// Matching documents, ordered by id
    fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Merge `fields` into the document, creating it if needed
    fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Merge every document in `batch`; all or nothing
    fn commit_batch(&self, collection: &str, batch: &[Document]) -> Result<()>;

    fn count(&self, collection: &str, filter: &Filter) -> Result<usize> {
        Ok(self.query(collection, filter)?.len())
    }
}

/// Shallow merge: keys in `changes` overwrite keys in `target`
pub(crate) fn merge_fields(target: &mut Fields, changes: &Fields) {
    for (name, value) in changes {
        target.insert(name.clone(), value.clone());
    }
}
