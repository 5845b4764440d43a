// src/utils/trace.rs

//! Step logging gated by the notifier's `debug` option.

use std::fmt;

/// Log a notifier step.
///
/// With `debug` on, steps are promoted to info level and tagged so they show
/// up under a default log filter.
pub fn step(debug: bool, message: fmt::Arguments<'_>) {
    if debug {
        log::info!("[UpdateNotifier] {message}");
    } else {
        log::debug!("{message}");
    }
}
