// src/lib.rs

//! Update Notifier Library
//!
//! Detects that a web application's deployed build changed while a page is
//! open, by periodically fingerprinting the asset references of a reference
//! document, and offers to reload.

pub mod error;
pub mod host;
pub mod models;
pub mod notifier;
pub mod pipeline;
pub mod utils;

#[cfg(test)]
mod testing;

pub use notifier::{Notifier, NotifierBuilder, create_notifier};
