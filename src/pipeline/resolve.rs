//! Configuration resolver.
//!
//! Turns partial [`NotifierOptions`] into a complete [`ResolvedConfig`].
//! Resolution never fails: a pattern that does not compile, or that has no
//! `src` group, is kept as "no pattern" and simply yields empty fingerprints.

use std::time::Duration;

use regex::Regex;

use crate::models::{NotifierOptions, NotifyType};

/// Polling interval used when none is given.
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 10_000;

/// Matches the opening of a `<script ... src="...">` tag.
pub const DEFAULT_SCRIPT_PATTERN: &str = r#"(?m)<script.*src=["'](?P<src>[^"']+)"#;

pub const DEFAULT_PROMPT_MESSAGE: &str =
    "A new version is available. Reload the page to update?";

pub const DEFAULT_INDEX_PATH: &str = "/";

/// Name of the capture group holding an asset identifier.
pub const SRC_GROUP: &str = "src";

/// Operating mode, fixed for a notifier's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The notifier schedules its own checks.
    Polling {
        interval: Duration,
        pause_on_hidden: bool,
        immediate: bool,
    },
    /// Every check is triggered by the embedding application.
    Manual,
}

impl Mode {
    pub fn is_manual(&self) -> bool {
        matches!(self, Mode::Manual)
    }

    pub fn interval(&self) -> Option<Duration> {
        match self {
            Mode::Polling { interval, .. } => Some(*interval),
            Mode::Manual => None,
        }
    }

    /// Always false in manual mode.
    pub fn pause_on_hidden(&self) -> bool {
        matches!(
            self,
            Mode::Polling {
                pause_on_hidden: true,
                ..
            }
        )
    }

    /// Always false in manual mode.
    pub fn immediate(&self) -> bool {
        matches!(
            self,
            Mode::Polling {
                immediate: true,
                ..
            }
        )
    }
}

/// Complete, immutable notifier configuration.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub mode: Mode,
    pub notify_type: NotifyType,
    pub index_path: String,
    /// `None` when the configured pattern is unusable
    pub pattern: Option<Regex>,
    pub debug: bool,
    pub prompt_message: String,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        resolve(&NotifierOptions::default())
    }
}

/// Resolve partial options, applying defaults.
pub fn resolve(options: &NotifierOptions) -> ResolvedConfig {
    let mode = match options.polling_interval {
        Some(0) => Mode::Manual,
        interval => Mode::Polling {
            interval: Duration::from_millis(interval.unwrap_or(DEFAULT_POLLING_INTERVAL_MS)),
            pause_on_hidden: options.pause_on_hidden.unwrap_or(true),
            immediate: options.immediate.unwrap_or(true),
        },
    };

    let index_path = match options.index_path.as_deref() {
        None | Some("") => DEFAULT_INDEX_PATH.to_string(),
        Some(path) => path.to_string(),
    };

    let source = options
        .script_pattern
        .as_deref()
        .unwrap_or(DEFAULT_SCRIPT_PATTERN);

    ResolvedConfig {
        mode,
        notify_type: options.notify_type.unwrap_or_default(),
        index_path,
        pattern: compile_pattern(source),
        debug: options.debug.unwrap_or(false),
        prompt_message: options
            .prompt_message
            .clone()
            .unwrap_or_else(|| DEFAULT_PROMPT_MESSAGE.to_string()),
    }
}

fn compile_pattern(source: &str) -> Option<Regex> {
    let regex = match Regex::new(source) {
        Ok(regex) => regex,
        Err(e) => {
            log::warn!("Extraction pattern {source:?} does not compile, fingerprints will be empty: {e}");
            return None;
        }
    };

    if !regex.capture_names().flatten().any(|name| name == SRC_GROUP) {
        log::warn!("Extraction pattern {source:?} has no `{SRC_GROUP}` group, fingerprints will be empty");
        return None;
    }

    Some(regex)
}
