// src/crypto/encrypt.rs
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use serde_json::Value;

use crate::consts::IV_LENGTH;
use crate::error::{CoreError, Result};
use crate::key_ops::MasterKey;

/// Fresh 96-bit IV from the thread-local CSPRNG. Never reuse one.
pub fn generate_iv() -> [u8; IV_LENGTH] {
    let mut iv = [0u8; IV_LENGTH];
    rand::rng().fill_bytes(&mut iv);
    iv
}

/// Encrypt bytes → `IV || ciphertext || tag` (in-memory)
pub fn encrypt_to_vec(plaintext: &[u8], key: &MasterKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CoreError::EncryptionFailure(e.to_string()))?;
    let iv = generate_iv();

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CoreError::EncryptionFailure(e.to_string()))?;

    let mut out = Vec::with_capacity(IV_LENGTH + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Encrypt any JSON value into a base64 envelope
///
/// The value is serialized as JSON text first, so strings, numbers and
/// structures all come back with their original type.
pub fn encrypt_value(plaintext: &Value, key: &MasterKey) -> Result<String> {
    let bytes =
        serde_json::to_vec(plaintext).map_err(|e| CoreError::EncryptionFailure(e.to_string()))?;
    let sealed = encrypt_to_vec(&bytes, key)?;
    Ok(STANDARD.encode(sealed))
}

pub fn encrypt_str(plaintext: &str, key: &MasterKey) -> Result<String> {
    encrypt_value(&Value::String(plaintext.to_owned()), key)
}
