// src/key_store.rs
//! Durable per-user key persistence with expiration
//!
//! Writes go through an ordered list of sinks (durable backend, then the
//! session cache); the first sink that accepts the key is the result.
//! Reads never fail on a backend error, they report the key as absent.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::key_db_conn::{open_key_db, open_key_db_in_memory};
use crate::db::key_db_ops::{
    delete_expired_key_record, delete_key_record, fetch_key_record, insert_key_record_if_absent,
    upsert_key_record, KeyRecord,
};
use crate::enums::KeyTier;
use crate::error::{CoreError, Result};
use crate::key_ops::MasterKey;
use crate::session::SessionCache;
use crate::util::now_millis;

/// Storage behind the durable tier
///
/// `insert_if_absent` must be atomic per uid: concurrent callers all get
/// back the same record. `delete_expired` must only remove a record that is
/// still expired when the delete runs.
pub trait KeyBackend: Send + Sync {
    fn get(&self, uid: &str) -> Result<Option<KeyRecord>>;
    fn put(&self, record: &KeyRecord) -> Result<()>;
    fn insert_if_absent(&self, record: &KeyRecord, now: i64) -> Result<KeyRecord>;
    /// `true` if an expired record was removed
    fn delete_expired(&self, uid: &str, now: i64) -> Result<bool>;
    fn delete(&self, uid: &str) -> Result<()>;
}

/// One backend shared by several stores
impl<T: KeyBackend + ?Sized> KeyBackend for Arc<T> {
    fn get(&self, uid: &str) -> Result<Option<KeyRecord>> {
        (**self).get(uid)
    }

    fn put(&self, record: &KeyRecord) -> Result<()> {
        (**self).put(record)
    }

    fn insert_if_absent(&self, record: &KeyRecord, now: i64) -> Result<KeyRecord> {
        (**self).insert_if_absent(record, now)
    }

    fn delete_expired(&self, uid: &str, now: i64) -> Result<bool> {
        (**self).delete_expired(uid, now)
    }

    fn delete(&self, uid: &str) -> Result<()> {
        (**self).delete(uid)
    }
}

/// Embedded SQLite key database
pub struct SqliteKeyBackend {
    conn: Mutex<Connection>,
}

impl SqliteKeyBackend {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Ok(Self::from_connection(open_key_db(db_path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(open_key_db_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl KeyBackend for SqliteKeyBackend {
    fn get(&self, uid: &str) -> Result<Option<KeyRecord>> {
        Ok(fetch_key_record(&self.conn.lock(), uid)?)
    }

    fn put(&self, record: &KeyRecord) -> Result<()> {
        Ok(upsert_key_record(&self.conn.lock(), record)?)
    }

    fn insert_if_absent(&self, record: &KeyRecord, now: i64) -> Result<KeyRecord> {
        Ok(insert_key_record_if_absent(&mut self.conn.lock(), record, now)?)
    }

    fn delete_expired(&self, uid: &str, now: i64) -> Result<bool> {
        Ok(delete_expired_key_record(&self.conn.lock(), uid, now)? > 0)
    }

    fn delete(&self, uid: &str) -> Result<()> {
        delete_key_record(&self.conn.lock(), uid)?;
        Ok(())
    }
}

pub struct KeyStore {
    backend: Box<dyn KeyBackend>,
    session: SessionCache,
}

impl KeyStore {
    pub fn new(backend: impl KeyBackend + 'static, session: SessionCache) -> Self {
        Self {
            backend: Box::new(backend),
            session,
        }
    }

    /// Persist `key` for `uid`, replacing any prior record
    ///
    /// Returns the tier that ended up holding the key.
    pub fn put(&self, uid: &str, key: &MasterKey, ttl_hours: u32) -> Result<KeyTier> {
        let record = KeyRecord::new(uid, key, ttl_hours, now_millis());

        let sinks: [(KeyTier, &dyn Fn() -> Result<()>); 2] = [
            (KeyTier::Durable, &|| self.backend.put(&record)),
            (KeyTier::Session, &|| self.session.store(uid, key)),
        ];

        let mut failures = Vec::new();
        for (tier, write) in sinks {
            match write() {
                Ok(()) => {
                    if !failures.is_empty() {
                        warn!(uid, ?tier, "durable key write failed, key kept in fallback tier");
                    }
                    return Ok(tier);
                }
                Err(e) => {
                    warn!(uid, ?tier, error = %e, "key write rejected");
                    failures.push(format!("{tier:?}: {e}"));
                }
            }
        }

        Err(CoreError::StorageFailure(failures.join("; ")))
    }

    /// The uid's key if a non-expired record exists
    pub fn get(&self, uid: &str) -> Result<Option<MasterKey>> {
        let now = now_millis();
        let Some(record) = self.read_record(uid) else {
            return Ok(None);
        };
        if !record.is_expired(now) {
            return MasterKey::from_base64(&record.key).map(Some);
        }

        debug!(uid, expired_at = record.expiration_time, "dropping expired key record");
        match self.backend.delete_expired(uid, now) {
            Ok(true) => Ok(None),
            Ok(false) => {
                // replaced by another creator since the read
                match self.read_record(uid) {
                    Some(fresh) if !fresh.is_expired(now) => {
                        debug!(uid, "expired key record was replaced concurrently");
                        MasterKey::from_base64(&fresh.key).map(Some)
                    }
                    _ => Ok(None),
                }
            }
            Err(e) => {
                warn!(uid, error = %e, "failed to delete expired key record");
                Ok(None)
            }
        }
    }

    fn read_record(&self, uid: &str) -> Option<KeyRecord> {
        match self.backend.get(uid) {
            Ok(record) => record,
            Err(e) => {
                warn!(uid, error = %e, "durable key read failed, treating key as absent");
                None
            }
        }
    }

    /// Insert `candidate` unless a live key already exists; returns the winner
    ///
    /// A failed insert never writes the durable tier. A live record that is
    /// still readable is adopted; otherwise `candidate` is held in the
    /// session tier only.
    pub fn get_or_create(&self, uid: &str, candidate: &MasterKey, ttl_hours: u32) -> Result<MasterKey> {
        let now = now_millis();
        let record = KeyRecord::new(uid, candidate, ttl_hours, now);

        match self.backend.insert_if_absent(&record, now) {
            Ok(winner) => {
                let key = MasterKey::from_base64(&winner.key)?;
                if winner.key == record.key {
                    info!(uid, fingerprint = %key.fingerprint(), "created master key");
                }
                Ok(key)
            }
            Err(e) => {
                warn!(uid, error = %e, "durable key creation failed");
                if let Ok(Some(live)) = self.backend.get(uid) {
                    if !live.is_expired(now_millis()) {
                        let key = MasterKey::from_base64(&live.key)?;
                        info!(uid, fingerprint = %key.fingerprint(), "adopted live durable key");
                        return Ok(key);
                    }
                }

                self.session.store(uid, candidate).map_err(|session_err| {
                    CoreError::StorageFailure(format!("durable: {e}; session: {session_err}"))
                })?;
                warn!(uid, "key held in session tier until the durable tier recovers");
                Ok(candidate.clone())
            }
        }
    }

    /// Remove the uid's record unconditionally
    pub fn delete(&self, uid: &str) -> Result<()> {
        self.backend.delete(uid)
    }
}
