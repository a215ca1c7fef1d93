// src/enums.rs
//! Public enum types used throughout the crate
//!
//! Central location for the enums that surface in results and logs.

use serde::{Deserialize, Serialize};

/// Where a master key was found or written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyTier {
    Memory,
    Session,
    Durable,
}

/// Per-collection migration state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MigrationPhase {
    #[default]
    Scanning,
    Batching,
    Encrypting,
    Committing,
    Done,
    PartiallyFailed,
}
