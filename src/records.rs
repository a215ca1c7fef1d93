// src/records.rs
//! Caller-side read/write path for encryptable collections
//!
//! Seals configured fields with the active key before a write and opens them
//! after a read. Opening is best-effort per field, like `decrypt_fields`.

use std::sync::Arc;

use serde_json::Value;

use crate::collection::CollectionSpec;
use crate::consts::{ENCRYPTED_FIELD, UID_FIELD};
use crate::crypto::{decrypt_fields, encrypt_fields};
use crate::error::Result;
use crate::key_manager::KeyManager;
use crate::store::{Document, DocumentStore, Filter};

pub struct EncryptedRecords {
    store: Arc<dyn DocumentStore>,
    keys: Arc<KeyManager>,
}

impl EncryptedRecords {
    pub fn new(store: Arc<dyn DocumentStore>, keys: Arc<KeyManager>) -> Self {
        Self { store, keys }
    }

    /// Encrypt and merge `document` into `spec`'s collection under `uid`
    pub fn save(&self, uid: &str, spec: &CollectionSpec, document: &Document) -> Result<()> {
        let key = self.keys.require_active_key(uid)?;

        let mut fields = encrypt_fields(&document.fields, spec.fields.as_slice(), &key)?;
        fields.insert(UID_FIELD.to_owned(), Value::String(uid.to_owned()));
        fields.insert(ENCRYPTED_FIELD.to_owned(), Value::Bool(true));

        self.store.update(&spec.name, &document.id, fields)
    }

    /// One document owned by `uid`, opened if it is marked encrypted
    pub fn load(&self, uid: &str, spec: &CollectionSpec, id: &str) -> Result<Option<Document>> {
        match self.store.get(&spec.name, id)? {
            Some(document) if document.uid() == Some(uid) => {
                Ok(Some(self.open(uid, spec, document)?))
            }
            _ => Ok(None),
        }
    }

    pub fn load_all(&self, uid: &str, spec: &CollectionSpec) -> Result<Vec<Document>> {
        self.store
            .query(&spec.name, &Filter::owned_by(uid))?
            .into_iter()
            .map(|document| self.open(uid, spec, document))
            .collect()
    }

    fn open(&self, uid: &str, spec: &CollectionSpec, document: Document) -> Result<Document> {
        if !document.is_encrypted() {
            return Ok(document);
        }
        let key = self.keys.require_active_key(uid)?;
        let fields = decrypt_fields(&document.fields, spec.fields.as_slice(), &key);
        Ok(Document::new(document.id, fields))
    }
}
