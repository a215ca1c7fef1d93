// src/crypto/decrypt.rs
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::consts::{IV_LENGTH, TAG_LENGTH};
use crate::error::{CoreError, Result};
use crate::key_ops::MasterKey;

/// Decrypt `IV || ciphertext || tag` → plaintext bytes (in-memory)
pub fn decrypt_to_vec(sealed: &[u8], key: &MasterKey) -> Result<Vec<u8>> {
    if sealed.len() < IV_LENGTH + TAG_LENGTH {
        return Err(CoreError::DecryptionFailure(format!(
            "envelope too short: {} bytes",
            sealed.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CoreError::DecryptionFailure(e.to_string()))?;
    let (iv, ciphertext) = sealed.split_at(IV_LENGTH);

    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|e| CoreError::DecryptionFailure(e.to_string()))
}

/// Decrypt a base64 envelope back into a JSON value
///
/// Plaintext that is not valid JSON (envelopes written by older clients
/// that stored bare strings) comes back as `Value::String`.
pub fn decrypt_value(envelope: &str, key: &MasterKey) -> Result<Value> {
    let sealed = STANDARD
        .decode(envelope.trim())
        .map_err(|e| CoreError::DecryptionFailure(format!("malformed envelope: {e}")))?;
    let plaintext = decrypt_to_vec(&sealed, key)?;
    let text = String::from_utf8(plaintext)
        .map_err(|e| CoreError::DecryptionFailure(format!("plaintext is not UTF-8: {e}")))?;

    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(text)),
    }
}

/// Decrypt an envelope that is expected to hold text
pub fn decrypt_to_string(envelope: &str, key: &MasterKey) -> Result<String> {
    match decrypt_value(envelope, key)? {
        Value::String(text) => Ok(text),
        other => Ok(other.to_string()),
    }
}
