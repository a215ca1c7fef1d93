// src/crypto/mod.rs
//! Pure cryptographic operations with no I/O
//!
//! Envelopes are `base64(IV[12] || ciphertext || tag)` under AES-256-GCM.
//! Field helpers work on JSON objects and never mutate their input.
mod decrypt;
mod encrypt;
mod fields;
mod legacy;

pub use decrypt::{decrypt_to_string, decrypt_to_vec, decrypt_value};
pub use encrypt::{encrypt_str, encrypt_to_vec, encrypt_value, generate_iv};
pub use fields::{
    batch_decrypt, batch_encrypt, decrypt_fields, decrypt_fields_detailed, encrypt_fields,
    populated_fields, FieldDecryption, FieldOutcome, Fields,
};
#[allow(deprecated)]
pub use legacy::derive_key_from_password;
