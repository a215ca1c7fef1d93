// src/key_ops.rs
//! Master key generation and representation
//!
//! Keys are 256 random bits from secure-gate, never derived from a
//! password, and travel between storage tiers as standard base64.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroize;

use crate::aliases::{MasterKey32, RandomMasterKey32, SecureRandomExt};
use crate::consts::KEY_LENGTH;
use crate::error::{CoreError, Result};

/// A user's 256-bit master key, zeroized on drop
pub struct MasterKey(MasterKey32);

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(MasterKey32::new(bytes))
    }

    /// Import a key from its base64 storage form
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CoreError::InvalidKey(e.to_string()))?;
        if raw.len() != KEY_LENGTH {
            let got = raw.len();
            raw.zeroize();
            return Err(CoreError::InvalidKey(format!(
                "expected {KEY_LENGTH} bytes, got {got}"
            )));
        }
        let mut bytes = [0u8; KEY_LENGTH];
        bytes.copy_from_slice(&raw);
        raw.zeroize();
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        Ok(key)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        self.0.expose_secret()
    }

    /// Short BLAKE3 digest, safe to log when comparing tiers
    pub fn fingerprint(&self) -> String {
        key_fingerprint(self)
    }
}

impl Clone for MasterKey {
    fn clone(&self) -> Self {
        Self::from_bytes(*self.as_bytes())
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for MasterKey {}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MasterKey").field(&self.fingerprint()).finish()
    }
}

/// Generate a new random 256-bit master key
#[inline]
pub fn generate_key() -> MasterKey {
    MasterKey(MasterKey32::new(**RandomMasterKey32::new()))
}

/// First 16 hex chars of BLAKE3 over the key bytes
pub fn key_fingerprint(key: &MasterKey) -> String {
    let digest = blake3::hash(key.as_bytes()).to_hex();
    digest.as_str()[..16].to_string()
}
