// tests/records_tests.rs
mod support;
use support::{fields, journal_entry, key_manager};

use std::sync::Arc;

use field_vault::crypto::decrypt_to_string;
use field_vault::{
    CollectionSpec, CoreError, Document, DocumentStore, EncryptedRecords, MemoryDocumentStore,
};
use serde_json::{json, Value};

#[test]
fn save_encrypts_at_rest_and_load_opens() {
    let keys = key_manager();
    assert!(keys.manager.initialize_encryption("alice"));
    let store = Arc::new(MemoryDocumentStore::new());
    let records = EncryptedRecords::new(store.clone(), keys.manager.clone());
    let spec = CollectionSpec::journal();
    let entry = journal_entry("alice", 1);

    records.save("alice", &spec, &entry).unwrap();

    let raw = store.get(&spec.name, &entry.id).unwrap().unwrap();
    assert!(raw.is_encrypted());
    assert_eq!(raw.uid(), Some("alice"));
    assert_ne!(raw.fields["title"], entry.fields["title"]);
    let key = keys.manager.active_key("alice").unwrap();
    assert_eq!(
        decrypt_to_string(raw.fields["learnings"].as_str().unwrap(), &key).unwrap(),
        "Context-aware encoding matters"
    );

    let loaded = records.load("alice", &spec, &entry.id).unwrap().unwrap();
    assert_eq!(loaded.fields["title"], entry.fields["title"]);
    assert_eq!(loaded.fields["content"], entry.fields["content"]);
    assert_eq!(loaded.fields["encrypted"], true);
}

#[test]
fn load_hides_other_users_records() {
    let keys = key_manager();
    assert!(keys.manager.initialize_encryption("alice"));
    let store = Arc::new(MemoryDocumentStore::new());
    let records = EncryptedRecords::new(store.clone(), keys.manager.clone());
    store.insert("journalEntries", journal_entry("bob", 1));

    let spec = CollectionSpec::journal();
    assert!(records.load("alice", &spec, "entry-0001").unwrap().is_none());
    assert!(records.load("alice", &spec, "nope").unwrap().is_none());
}

#[test]
fn load_all_returns_plaintext_and_sealed_records_opened() {
    let keys = key_manager();
    assert!(keys.manager.initialize_encryption("alice"));
    let store = Arc::new(MemoryDocumentStore::new());
    let records = EncryptedRecords::new(store.clone(), keys.manager.clone());
    let spec = CollectionSpec::journal();

    store.insert(&spec.name, journal_entry("alice", 1));
    records.save("alice", &spec, &journal_entry("alice", 2)).unwrap();

    let all = records.load_all("alice", &spec).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].fields["title"], "Day 1: XSS in the search box");
    assert_eq!(all[1].fields["title"], "Day 2: XSS in the search box");
}

#[test]
fn save_without_active_key_is_refused() {
    let keys = key_manager();
    let store = Arc::new(MemoryDocumentStore::new());
    let records = EncryptedRecords::new(store.clone(), keys.manager.clone());

    let result = records.save("alice", &CollectionSpec::journal(), &journal_entry("alice", 1));

    assert!(matches!(result, Err(CoreError::KeyUnavailable)));
    assert!(store.is_empty("journalEntries"));
}

#[test]
fn damaged_field_does_not_hide_the_rest_of_the_record() {
    let keys = key_manager();
    assert!(keys.manager.initialize_encryption("alice"));
    let store = Arc::new(MemoryDocumentStore::new());
    let records = EncryptedRecords::new(store.clone(), keys.manager.clone());
    let spec = CollectionSpec::new("notes", &["title", "body"], 10);

    let note = Document::new(
        "n1",
        fields(json!({ "title": "recon notes", "body": "subdomain list" })),
    );
    records.save("alice", &spec, &note).unwrap();
    store
        .update("notes", "n1", fields(json!({ "body": "truncated-envelope" })))
        .unwrap();

    let loaded = records.load("alice", &spec, "n1").unwrap().unwrap();
    assert_eq!(loaded.fields["title"], "recon notes");
    assert_eq!(loaded.fields["body"], Value::String("truncated-envelope".into()));
}
