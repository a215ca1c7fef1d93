// tests/key_store_tests.rs
mod common;
mod support;
use support::{BusyCreateBackend, CreateBeforeCleanupBackend, FailingKeyBackend, FullSessionStorage};

use std::sync::Arc;

use field_vault::db::key_db_ops::{key_record_id, KeyRecord};
use field_vault::util::now_millis;
use field_vault::enums::KeyTier;
use field_vault::{
    generate_key, CoreError, KeyBackend, KeyStore, SessionCache, SqliteKeyBackend,
};
use tempfile::tempdir;

fn sqlite_store() -> (Arc<SqliteKeyBackend>, SessionCache, KeyStore) {
    let backend = Arc::new(SqliteKeyBackend::in_memory().unwrap());
    let session = SessionCache::in_memory();
    let store = KeyStore::new(backend.clone(), session.clone());
    (backend, session, store)
}

#[test]
fn put_then_get_returns_same_key() {
    common::setup();
    let (_, _, store) = sqlite_store();
    let key = generate_key();

    assert_eq!(store.put("alice", &key, 24).unwrap(), KeyTier::Durable);
    assert_eq!(store.get("alice").unwrap(), Some(key));
    assert_eq!(store.get("bob").unwrap(), None);
}

#[test]
fn put_replaces_existing_record() {
    let (backend, _, store) = sqlite_store();
    let first = generate_key();
    let second = generate_key();

    store.put("alice", &first, 24).unwrap();
    store.put("alice", &second, 24).unwrap();

    assert_eq!(store.get("alice").unwrap(), Some(second));
    let record = backend.get("alice").unwrap().unwrap();
    assert_eq!(record.id, key_record_id("alice"));
    assert_eq!(record.id, "key_alice");
}

#[test]
fn record_expiration_is_ttl_hours_after_creation() {
    let (backend, _, store) = sqlite_store();
    store.put("alice", &generate_key(), 2).unwrap();

    let record = backend.get("alice").unwrap().unwrap();
    assert_eq!(record.expiration_time - record.created_at, 2 * 3_600_000);
}

#[test]
fn expired_record_is_absent_and_removed() {
    let (backend, _, store) = sqlite_store();
    store.put("alice", &generate_key(), 0).unwrap();
    assert!(backend.get("alice").unwrap().is_some());

    assert_eq!(store.get("alice").unwrap(), None);
    assert!(backend.get("alice").unwrap().is_none());
}

#[test]
fn get_or_create_keeps_the_first_key() {
    let (_, _, store) = sqlite_store();
    let first = generate_key();
    let second = generate_key();

    assert_eq!(store.get_or_create("alice", &first, 24).unwrap(), first);
    assert_eq!(store.get_or_create("alice", &second, 24).unwrap(), first);
    assert_eq!(store.get("alice").unwrap(), Some(first));
}

#[test]
fn get_or_create_replaces_an_expired_key() {
    let (_, _, store) = sqlite_store();
    let stale = generate_key();
    let fresh = generate_key();

    store.put("alice", &stale, 0).unwrap();
    assert_eq!(store.get_or_create("alice", &fresh, 24).unwrap(), fresh);
    assert_eq!(store.get("alice").unwrap(), Some(fresh));
}

#[test]
fn delete_removes_the_record() {
    let (_, _, store) = sqlite_store();
    store.put("alice", &generate_key(), 24).unwrap();

    store.delete("alice").unwrap();
    assert_eq!(store.get("alice").unwrap(), None);
    // deleting nothing is fine
    store.delete("alice").unwrap();
}

#[test]
fn keys_survive_reopening_the_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("keys.db");
    let key = generate_key();

    {
        let store = KeyStore::new(SqliteKeyBackend::open(&path).unwrap(), SessionCache::in_memory());
        store.put("alice", &key, 24).unwrap();
    }

    let store = KeyStore::new(SqliteKeyBackend::open(&path).unwrap(), SessionCache::in_memory());
    assert_eq!(store.get("alice").unwrap(), Some(key));
}

#[test]
fn failing_backend_falls_back_to_session_tier() {
    common::setup();
    let session = SessionCache::in_memory();
    let store = KeyStore::new(FailingKeyBackend, session.clone());
    let key = generate_key();

    assert_eq!(store.put("alice", &key, 24).unwrap(), KeyTier::Session);

    let cached = session.load().unwrap();
    assert_eq!(cached.key, key);
    assert_eq!(cached.uid.as_deref(), Some("alice"));
}

#[test]
fn failing_backend_reads_as_absent() {
    let store = KeyStore::new(FailingKeyBackend, SessionCache::in_memory());
    assert_eq!(store.get("alice").unwrap(), None);
}

#[test]
fn get_or_create_without_backend_returns_candidate() {
    let store = KeyStore::new(FailingKeyBackend, SessionCache::in_memory());
    let candidate = generate_key();
    assert_eq!(store.get_or_create("alice", &candidate, 24).unwrap(), candidate);
}

#[test]
fn every_tier_failing_is_a_storage_failure() {
    let store = KeyStore::new(
        FailingKeyBackend,
        SessionCache::new(Arc::new(FullSessionStorage)),
    );

    let result = store.put("alice", &generate_key(), 24);
    assert!(matches!(result, Err(CoreError::StorageFailure(_))));
}

#[test]
fn failed_create_keeps_the_live_durable_key() {
    common::setup();
    let inner = Arc::new(SqliteKeyBackend::in_memory().unwrap());
    let live = generate_key();
    inner
        .put(&KeyRecord::new("alice", &live, 24, now_millis()))
        .unwrap();
    let session = SessionCache::in_memory();
    let store = KeyStore::new(BusyCreateBackend::new(inner.clone(), 1), session.clone());

    let winner = store.get_or_create("alice", &generate_key(), 24).unwrap();

    assert_eq!(winner, live);
    assert_eq!(inner.get("alice").unwrap().unwrap().key, live.to_base64());
    assert!(session.load().is_none());
}

#[test]
fn failed_create_without_live_key_writes_session_tier_only() {
    let inner = Arc::new(SqliteKeyBackend::in_memory().unwrap());
    let session = SessionCache::in_memory();
    let store = KeyStore::new(BusyCreateBackend::new(inner.clone(), 1), session.clone());
    let candidate = generate_key();

    assert_eq!(store.get_or_create("alice", &candidate, 24).unwrap(), candidate);

    assert!(inner.get("alice").unwrap().is_none());
    assert_eq!(session.load().unwrap().key, candidate);
}

#[test]
fn expired_cleanup_spares_a_concurrently_created_key() {
    let inner = Arc::new(SqliteKeyBackend::in_memory().unwrap());
    inner
        .put(&KeyRecord::new("alice", &generate_key(), 0, now_millis()))
        .unwrap();
    let backend = CreateBeforeCleanupBackend::new(inner.clone());
    let other_tab = backend.other_key.clone();
    let store = KeyStore::new(backend, SessionCache::in_memory());

    assert_eq!(store.get("alice").unwrap(), Some(other_tab.clone()));
    assert_eq!(inner.get("alice").unwrap().unwrap().key, other_tab.to_base64());
}

#[test]
fn delete_expired_only_removes_expired_records() {
    let backend = SqliteKeyBackend::in_memory().unwrap();
    backend
        .put(&KeyRecord::new("alice", &generate_key(), 24, now_millis()))
        .unwrap();
    backend
        .put(&KeyRecord::new("bob", &generate_key(), 0, now_millis()))
        .unwrap();

    assert!(!backend.delete_expired("alice", now_millis()).unwrap());
    assert!(backend.get("alice").unwrap().is_some());
    assert!(backend.delete_expired("bob", now_millis()).unwrap());
    assert!(backend.get("bob").unwrap().is_none());
}
