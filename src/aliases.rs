// src/aliases.rs
//! Re-exports secure-gate's ergonomic secret types
//!
//! These are the canonical secret containers used throughout field-vault.
//! Everything declared here zeroizes on drop.

pub use secure_gate::{dynamic_alias, fixed_alias, random_alias, SecureRandomExt};

// Fixed-size secrets
fixed_alias!(MasterKey32, 32); // 256-bit per-user master key

// Dynamic secrets
dynamic_alias!(UserPassphrase, String); // legacy password-derived keys only

// Random secrets
random_alias!(RandomMasterKey32, 32); // fresh master keys
