// src/store/memory.rs
use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use super::{merge_fields, Document, DocumentStore, Filter};
use crate::crypto::Fields;
use crate::error::Result;

type Collection = BTreeMap<String, Fields>;

/// In-process store; a whole batch is applied under one lock
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (not merge) a document
    pub fn insert(&self, collection: &str, document: Document) {
        self.collections
            .lock()
            .entry(collection.to_owned())
            .or_default()
            .insert(document.id, document.fields);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.lock();
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(documents
            .iter()
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .filter(|document| filter.matches(document))
            .collect())
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let mut collections = self.collections.lock();
        let target = collections
            .entry(collection.to_owned())
            .or_default()
            .entry(id.to_owned())
            .or_default();
        merge_fields(target, &fields);
        Ok(())
    }

    fn commit_batch(&self, collection: &str, batch: &[Document]) -> Result<()> {
        let mut collections = self.collections.lock();
        let documents = collections.entry(collection.to_owned()).or_default();
        for document in batch {
            merge_fields(
                documents.entry(document.id.clone()).or_default(),
                &document.fields,
            );
        }
        Ok(())
    }
}
