// src/crypto/fields.rs
//! Field-level helpers over JSON objects
//!
//! Encryption is all-or-nothing per record. Decryption is best-effort per
//! field: a field that fails to open keeps its stored value and the rest of
//! the record is still returned.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use super::decrypt::decrypt_value;
use super::encrypt::encrypt_value;
use crate::error::Result;
use crate::key_ops::MasterKey;

/// A record's fields, as stored in the document store
pub type Fields = Map<String, Value>;

/// What happened to one named field during `decrypt_fields_detailed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Decrypted,
    /// Absent, null, or not a string (cannot be an envelope)
    Skipped,
    Failed(String),
}

/// Merged record plus the per-field outcome map
#[derive(Debug, Clone)]
pub struct FieldDecryption {
    pub record: Fields,
    pub outcomes: BTreeMap<String, FieldOutcome>,
}

impl FieldDecryption {
    pub fn failed_fields(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, FieldOutcome::Failed(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_fields().is_empty()
    }
}

/// Names from `field_names` that are present and non-null on `record`
pub fn populated_fields<'a, S: AsRef<str>>(record: &Fields, field_names: &'a [S]) -> Vec<&'a str> {
    field_names
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| !matches!(record.get(*name), None | Some(Value::Null)))
        .collect()
}

/// Replace every named, non-null field with its envelope
pub fn encrypt_fields<S: AsRef<str>>(
    record: &Fields,
    field_names: &[S],
    key: &MasterKey,
) -> Result<Fields> {
    let mut sealed = record.clone();
    for name in populated_fields(record, field_names) {
        if let Some(value) = record.get(name) {
            let envelope = encrypt_value(value, key)?;
            sealed.insert(name.to_owned(), Value::String(envelope));
        }
    }
    Ok(sealed)
}

pub fn decrypt_fields_detailed<S: AsRef<str>>(
    record: &Fields,
    field_names: &[S],
    key: &MasterKey,
) -> FieldDecryption {
    let mut opened = record.clone();
    let mut outcomes = BTreeMap::new();

    for name in field_names.iter().map(|name| name.as_ref()) {
        let outcome = match record.get(name) {
            Some(Value::String(envelope)) => match decrypt_value(envelope, key) {
                Ok(value) => {
                    opened.insert(name.to_owned(), value);
                    FieldOutcome::Decrypted
                }
                Err(e) => {
                    warn!(field = name, error = %e, "field decryption failed, keeping stored value");
                    FieldOutcome::Failed(e.to_string())
                }
            },
            _ => FieldOutcome::Skipped,
        };
        outcomes.insert(name.to_owned(), outcome);
    }

    FieldDecryption {
        record: opened,
        outcomes,
    }
}

/// Best-effort mirror of `encrypt_fields`; never fails as a whole
pub fn decrypt_fields<S: AsRef<str>>(record: &Fields, field_names: &[S], key: &MasterKey) -> Fields {
    decrypt_fields_detailed(record, field_names, key).record
}

pub fn batch_encrypt<S: AsRef<str>>(
    records: &[Fields],
    field_names: &[S],
    key: &MasterKey,
) -> Result<Vec<Fields>> {
    records
        .iter()
        .map(|record| encrypt_fields(record, field_names, key))
        .collect()
}

pub fn batch_decrypt<S: AsRef<str>>(
    records: &[Fields],
    field_names: &[S],
    key: &MasterKey,
) -> Vec<Fields> {
    records
        .iter()
        .map(|record| decrypt_fields(record, field_names, key))
        .collect()
}
