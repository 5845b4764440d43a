// src/models/mod.rs

//! Domain models for the update notifier.

mod config;
mod fingerprint;

// Re-export all public types
pub use config::{Config, HttpConfig, NotifierOptions, NotifyType};
pub use fingerprint::Fingerprint;
