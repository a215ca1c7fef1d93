// src/crypto/legacy.rs
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::aliases::UserPassphrase;
use crate::consts::{KEY_LENGTH, LEGACY_PBKDF2_ITERATIONS};
use crate::key_ops::MasterKey;

/// PBKDF2-HMAC-SHA256 key from a passphrase and salt
///
/// Only for opening envelopes written under password-derived keys by
/// early clients. New keys come from `key_ops::generate_key`.
#[deprecated(note = "master keys are random; use key_ops::generate_key")]
pub fn derive_key_from_password(passphrase: &UserPassphrase, salt: &[u8]) -> MasterKey {
    let mut out = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(
        passphrase.expose_secret().as_bytes(),
        salt,
        LEGACY_PBKDF2_ITERATIONS,
        &mut out,
    );
    let key = MasterKey::from_bytes(out);
    out.zeroize();
    key
}
