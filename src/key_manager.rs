// src/key_manager.rs
//! Active-key orchestration across process memory, session and durable tiers
//!
//! Lookup order is memory → session → durable store. A miss on every tier
//! creates a key through the store's compare-and-set path, so two first-use
//! callers for one uid converge on a single key.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::consts::DEFAULT_KEY_TTL_HOURS;
use crate::enums::KeyTier;
use crate::error::{CoreError, Result};
use crate::key_ops::{generate_key, MasterKey};
use crate::key_store::KeyStore;
use crate::session::SessionCache;

struct CachedKey {
    uid: String,
    key: MasterKey,
}

/// Process-memory tier
///
/// Owned by the application lifecycle and injected into `KeyManager`.
/// Last write wins.
#[derive(Default)]
pub struct KeyCache {
    slot: Mutex<Option<CachedKey>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached key, if it belongs to `uid`
    pub fn get(&self, uid: &str) -> Option<MasterKey> {
        self.slot
            .lock()
            .as_ref()
            .filter(|cached| cached.uid == uid)
            .map(|cached| cached.key.clone())
    }

    pub fn current_uid(&self) -> Option<String> {
        self.slot.lock().as_ref().map(|cached| cached.uid.clone())
    }

    pub fn set(&self, uid: &str, key: MasterKey) {
        *self.slot.lock() = Some(CachedKey {
            uid: uid.to_owned(),
            key,
        });
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

pub struct KeyManager {
    store: KeyStore,
    session: SessionCache,
    cache: Arc<KeyCache>,
    ttl_hours: u32,
}

impl KeyManager {
    pub fn new(store: KeyStore, session: SessionCache, cache: Arc<KeyCache>) -> Self {
        Self {
            store,
            session,
            cache,
            ttl_hours: DEFAULT_KEY_TTL_HOURS,
        }
    }

    pub fn with_ttl_hours(mut self, ttl_hours: u32) -> Self {
        self.ttl_hours = ttl_hours;
        self
    }

    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    pub fn ttl_hours(&self) -> u32 {
        self.ttl_hours
    }

    /// Durable key for `uid`, created on first use or after expiry
    pub fn get_user_master_key(&self, uid: &str) -> Result<MasterKey> {
        if let Some(key) = self.store.get(uid)? {
            debug!(uid, fingerprint = %key.fingerprint(), "master key found in durable tier");
            return Ok(key);
        }

        let candidate = generate_key();
        self.store.get_or_create(uid, &candidate, self.ttl_hours)
    }

    /// Make a key active for this session. Never raises.
    ///
    /// `false` means no key could be obtained and the caller must
    /// re-authenticate or continue without encryption.
    pub fn initialize_encryption(&self, uid: &str) -> bool {
        match self.try_initialize(uid) {
            Ok(tier) => {
                debug!(uid, ?tier, "encryption initialized");
                true
            }
            Err(e) => {
                error!(uid, error = %e, "failed to initialize encryption");
                false
            }
        }
    }

    fn try_initialize(&self, uid: &str) -> Result<KeyTier> {
        if self.cache.get(uid).is_some() {
            return Ok(KeyTier::Memory);
        }
        if let Some(other) = self.cache.current_uid() {
            warn!(uid, cached_uid = %other, "discarding cached key of another user");
            self.cache.clear();
        }

        if let Some(key) = self.restore_from_session(uid) {
            let durable = self.store.get_or_create(uid, &key, self.ttl_hours)?;
            if durable != key {
                warn!(
                    uid,
                    session = %key.fingerprint(),
                    durable = %durable.fingerprint(),
                    "session key disagrees with durable tier, adopting durable key"
                );
                self.store_encryption_key(uid, &durable);
            }
            return Ok(KeyTier::Session);
        }

        let key = self.get_user_master_key(uid)?;
        self.store_encryption_key(uid, &key);
        Ok(KeyTier::Durable)
    }

    /// Promote a session key for `uid` into process memory
    fn restore_from_session(&self, uid: &str) -> Option<MasterKey> {
        let cached = self.session.load()?;
        if !cached.belongs_to(uid) {
            debug!(uid, "session key belongs to another user");
            return None;
        }

        if cached.uid.is_none() {
            if let Err(e) = self.session.store(uid, &cached.key) {
                warn!(uid, error = %e, "failed to mark session key with its owner");
            }
        }
        self.cache.set(uid, cached.key.clone());
        Some(cached.key)
    }

    /// Cheap re-entry check for page loads and route changes
    pub fn check_and_restore_encryption(&self, uid: &str) -> bool {
        if self.cache.get(uid).is_some() {
            return true;
        }
        if self.restore_from_session(uid).is_some() {
            debug!(uid, "encryption restored from session tier");
            return true;
        }
        self.initialize_encryption(uid)
    }

    /// Set the active key in memory and session tiers
    pub fn store_encryption_key(&self, uid: &str, key: &MasterKey) {
        self.cache.set(uid, key.clone());
        if let Err(e) = self.session.store(uid, key) {
            warn!(uid, error = %e, "session tier rejected key, memory tier only");
        }
    }

    /// Ordinary sign-out: the durable record survives for the next sign-in
    pub fn clear_encryption_key(&self) {
        self.cache.clear();
        self.session.clear();
    }

    /// Account deletion: the key becomes unrecoverable
    pub fn permanently_delete_encryption_key(&self, uid: &str) -> Result<()> {
        self.clear_encryption_key();
        self.store.delete(uid)?;
        warn!(uid, "master key permanently deleted");
        Ok(())
    }

    pub fn active_key(&self, uid: &str) -> Option<MasterKey> {
        self.cache.get(uid)
    }

    pub fn require_active_key(&self, uid: &str) -> Result<MasterKey> {
        self.active_key(uid).ok_or(CoreError::KeyUnavailable)
    }
}
