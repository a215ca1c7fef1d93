// src/collection.rs
//! Encryptable collections: which fields are sealed and how big a batch is

use serde::{Deserialize, Serialize};

use crate::consts::{
    BUG_REPORT_BATCH_SIZE, BUG_REPORT_COLLECTION, BUG_REPORT_FIELDS, JOURNAL_BATCH_SIZE,
    JOURNAL_COLLECTION, JOURNAL_FIELDS,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub fields: Vec<String>,
    /// Records per atomic commit; at least 1
    pub batch_size: usize,
}

impl CollectionSpec {
    pub fn new<S: AsRef<str>>(name: &str, fields: &[S], batch_size: usize) -> Self {
        Self {
            name: name.to_owned(),
            fields: fields.iter().map(|f| f.as_ref().to_owned()).collect(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn journal() -> Self {
        Self::new(JOURNAL_COLLECTION, JOURNAL_FIELDS, JOURNAL_BATCH_SIZE)
    }

    pub fn bug_reports() -> Self {
        Self::new(BUG_REPORT_COLLECTION, BUG_REPORT_FIELDS, BUG_REPORT_BATCH_SIZE)
    }
}
