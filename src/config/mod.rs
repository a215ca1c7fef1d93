// src/config/mod.rs
//! Configuration system for field-vault
//!
//! Lazy-loaded global config with TOML + env overrides, plus explicit
//! constructors for callers that inject their own.

pub use app::{load, CollectionConfig, Config, Keys, Paths};

mod app;
mod defaults;
