// src/session.rs
//! Session-scoped key cache tier
//!
//! Mirrors the active key into a short-lived key-value surface (slots `_ek`
//! and `_ek_uid`). It survives reloads within a session, never devices.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::consts::{SESSION_KEY_SLOT, SESSION_UID_SLOT};
use crate::error::Result;
use crate::key_ops::MasterKey;

/// Get/set/remove by fixed slot names
pub trait SessionStorage: Send + Sync {
    fn get(&self, slot: &str) -> Option<String>;
    fn set(&self, slot: &str, value: String) -> Result<()>;
    fn remove(&self, slot: &str);
}

/// In-process session surface
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, slot: &str) -> Option<String> {
        self.slots.lock().get(slot).cloned()
    }

    fn set(&self, slot: &str, value: String) -> Result<()> {
        self.slots.lock().insert(slot.to_owned(), value);
        Ok(())
    }

    fn remove(&self, slot: &str) {
        self.slots.lock().remove(slot);
    }
}

/// A key read back from the session tier
#[derive(Debug, Clone)]
pub struct SessionKey {
    pub key: MasterKey,
    /// `None` when written without a uid marker
    pub uid: Option<String>,
}

impl SessionKey {
    /// Unmarked entries are accepted for any uid
    pub fn belongs_to(&self, uid: &str) -> bool {
        self.uid.as_deref().map_or(true, |owner| owner == uid)
    }
}

/// Typed view over a `SessionStorage`
#[derive(Clone)]
pub struct SessionCache {
    storage: Arc<dyn SessionStorage>,
}

impl SessionCache {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    pub fn load(&self) -> Option<SessionKey> {
        let encoded = self.storage.get(SESSION_KEY_SLOT)?;
        match MasterKey::from_base64(&encoded) {
            Ok(key) => Some(SessionKey {
                key,
                uid: self.storage.get(SESSION_UID_SLOT),
            }),
            Err(e) => {
                warn!(error = %e, "discarding unreadable session key");
                self.clear();
                None
            }
        }
    }

    pub fn store(&self, uid: &str, key: &MasterKey) -> Result<()> {
        self.storage.set(SESSION_KEY_SLOT, key.to_base64())?;
        self.storage.set(SESSION_UID_SLOT, uid.to_owned())
    }

    pub fn clear(&self) {
        self.storage.remove(SESSION_KEY_SLOT);
        self.storage.remove(SESSION_UID_SLOT);
    }
}
