// tests/support.rs
//! Test utilities: key managers, seeded stores and failure-injecting doubles

use std::collections::HashSet;
use std::sync::Arc;

use field_vault::crypto::Fields;
use field_vault::db::key_db_ops::KeyRecord;
use field_vault::{
    generate_key, CoreError, CoreResult, Document, DocumentStore, Filter, KeyBackend, KeyCache, KeyManager,
    KeyStore, MemoryDocumentStore, MemorySessionStorage, SessionCache, SessionStorage,
    MasterKey, SqliteKeyBackend,
};
use field_vault::util::now_millis;
use parking_lot::Mutex;
use serde_json::{json, Value};

/// A key manager plus handles on the tiers it was built from
#[allow(dead_code)]
pub struct TestKeys {
    pub manager: Arc<KeyManager>,
    pub session_storage: Arc<MemorySessionStorage>,
    pub session: SessionCache,
    pub cache: Arc<KeyCache>,
}

#[allow(dead_code)]
pub fn key_manager_with(backend: impl KeyBackend + 'static) -> TestKeys {
    key_manager_sharing(backend, Arc::new(MemorySessionStorage::new()))
}

/// Fresh process-memory tier over existing durable and session tiers
#[allow(dead_code)]
pub fn key_manager_sharing(
    backend: impl KeyBackend + 'static,
    session_storage: Arc<MemorySessionStorage>,
) -> TestKeys {
    let session = SessionCache::new(session_storage.clone());
    let cache = Arc::new(KeyCache::new());
    let manager = Arc::new(KeyManager::new(
        KeyStore::new(backend, session.clone()),
        session.clone(),
        cache.clone(),
    ));
    TestKeys {
        manager,
        session_storage,
        session,
        cache,
    }
}

#[allow(dead_code)]
pub fn key_manager() -> TestKeys {
    key_manager_with(SqliteKeyBackend::in_memory().expect("in-memory key db"))
}

#[allow(dead_code)]
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

#[allow(dead_code)]
pub fn journal_entry(uid: &str, n: usize) -> Document {
    Document::new(
        format!("entry-{n:04}"),
        fields(json!({
            "uid": uid,
            "title": format!("Day {n}: XSS in the search box"),
            "content": "Reflected payload survived the template escape",
            "learnings": "Context-aware encoding matters",
            "xp": 25,
        })),
    )
}

#[allow(dead_code)]
pub fn bug_report(uid: &str, n: usize) -> Document {
    Document::new(
        format!("bug-{n:04}"),
        fields(json!({
            "uid": uid,
            "title": format!("IDOR on /api/orders/{n}"),
            "description": "Order ids are sequential and unchecked",
            "impact": "Read any customer's order",
            "severity": "high",
        })),
    )
}

#[allow(dead_code)]
pub fn seed(store: &MemoryDocumentStore, collection: &str, documents: Vec<Document>) {
    for document in documents {
        store.insert(collection, document);
    }
}

/// Durable backend that refuses every operation
#[allow(dead_code)]
pub struct FailingKeyBackend;

impl KeyBackend for FailingKeyBackend {
    fn get(&self, _uid: &str) -> CoreResult<Option<KeyRecord>> {
        Err(CoreError::StorageFailure("disk unavailable".into()))
    }

    fn put(&self, _record: &KeyRecord) -> CoreResult<()> {
        Err(CoreError::StorageFailure("disk unavailable".into()))
    }

    fn insert_if_absent(&self, _record: &KeyRecord, _now: i64) -> CoreResult<KeyRecord> {
        Err(CoreError::StorageFailure("disk unavailable".into()))
    }

    fn delete_expired(&self, _uid: &str, _now: i64) -> CoreResult<bool> {
        Err(CoreError::StorageFailure("disk unavailable".into()))
    }

    fn delete(&self, _uid: &str) -> CoreResult<()> {
        Err(CoreError::StorageFailure("disk unavailable".into()))
    }
}

/// Session surface whose writes are always rejected
#[allow(dead_code)]
pub struct FullSessionStorage;

impl SessionStorage for FullSessionStorage {
    fn get(&self, _slot: &str) -> Option<String> {
        None
    }

    fn set(&self, _slot: &str, _value: String) -> CoreResult<()> {
        Err(CoreError::StorageFailure("session quota exceeded".into()))
    }

    fn remove(&self, _slot: &str) {}
}

/// Wraps a memory store, records every commit and fails chosen ones
#[allow(dead_code)]
pub struct RecordingStore {
    pub inner: MemoryDocumentStore,
    commits: Mutex<Vec<usize>>,
    fail_commits: Mutex<HashSet<usize>>,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn new(inner: MemoryDocumentStore) -> Self {
        Self {
            inner,
            commits: Mutex::new(Vec::new()),
            fail_commits: Mutex::new(HashSet::new()),
        }
    }

    /// Fail the n-th commit attempt (1-based, counted across runs)
    pub fn fail_commit(&self, attempt: usize) {
        self.fail_commits.lock().insert(attempt);
    }

    /// Sizes of every attempted commit, in order
    pub fn commit_sizes(&self) -> Vec<usize> {
        self.commits.lock().clone()
    }
}

impl DocumentStore for RecordingStore {
    fn query(&self, collection: &str, filter: &Filter) -> CoreResult<Vec<Document>> {
        self.inner.query(collection, filter)
    }

    fn get(&self, collection: &str, id: &str) -> CoreResult<Option<Document>> {
        self.inner.get(collection, id)
    }

    fn update(&self, collection: &str, id: &str, fields: Fields) -> CoreResult<()> {
        self.inner.update(collection, id, fields)
    }

    fn commit_batch(&self, collection: &str, batch: &[Document]) -> CoreResult<()> {
        let attempt = {
            let mut commits = self.commits.lock();
            commits.push(batch.len());
            commits.len()
        };
        if self.fail_commits.lock().contains(&attempt) {
            return Err(CoreError::StorageFailure(format!("commit {attempt} rejected")));
        }
        self.inner.commit_batch(collection, batch)
    }
}

/// SQLite backend whose compare-and-set insert is busy for the first `n` calls
#[allow(dead_code)]
pub struct BusyCreateBackend {
    pub inner: Arc<SqliteKeyBackend>,
    busy_left: Mutex<usize>,
}

#[allow(dead_code)]
impl BusyCreateBackend {
    pub fn new(inner: Arc<SqliteKeyBackend>, busy_calls: usize) -> Self {
        Self {
            inner,
            busy_left: Mutex::new(busy_calls),
        }
    }
}

impl KeyBackend for BusyCreateBackend {
    fn get(&self, uid: &str) -> CoreResult<Option<KeyRecord>> {
        self.inner.get(uid)
    }

    fn put(&self, record: &KeyRecord) -> CoreResult<()> {
        self.inner.put(record)
    }

    fn insert_if_absent(&self, record: &KeyRecord, now: i64) -> CoreResult<KeyRecord> {
        {
            let mut busy_left = self.busy_left.lock();
            if *busy_left > 0 {
                *busy_left -= 1;
                return Err(CoreError::StorageFailure("database is locked".into()));
            }
        }
        self.inner.insert_if_absent(record, now)
    }

    fn delete_expired(&self, uid: &str, now: i64) -> CoreResult<bool> {
        self.inner.delete_expired(uid, now)
    }

    fn delete(&self, uid: &str) -> CoreResult<()> {
        self.inner.delete(uid)
    }
}

/// SQLite backend where another caller writes a fresh key for the uid just
/// before an expired-record cleanup runs
#[allow(dead_code)]
pub struct CreateBeforeCleanupBackend {
    pub inner: Arc<SqliteKeyBackend>,
    pub other_key: MasterKey,
}

#[allow(dead_code)]
impl CreateBeforeCleanupBackend {
    pub fn new(inner: Arc<SqliteKeyBackend>) -> Self {
        Self {
            inner,
            other_key: generate_key(),
        }
    }
}

impl KeyBackend for CreateBeforeCleanupBackend {
    fn get(&self, uid: &str) -> CoreResult<Option<KeyRecord>> {
        self.inner.get(uid)
    }

    fn put(&self, record: &KeyRecord) -> CoreResult<()> {
        self.inner.put(record)
    }

    fn insert_if_absent(&self, record: &KeyRecord, now: i64) -> CoreResult<KeyRecord> {
        self.inner.insert_if_absent(record, now)
    }

    fn delete_expired(&self, uid: &str, now: i64) -> CoreResult<bool> {
        self.inner
            .put(&KeyRecord::new(uid, &self.other_key, 24, now_millis()))?;
        self.inner.delete_expired(uid, now)
    }

    fn delete(&self, uid: &str) -> CoreResult<()> {
        self.inner.delete(uid)
    }
}
