//! User-facing configuration structures.
//!
//! Everything here is "partial": each notifier option may be left out and is
//! filled in later by the resolver (`pipeline::resolve`).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root configuration file (`update-notifier.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Detection and notification behavior
    #[serde(default)]
    pub notifier: NotifierOptions,

    /// HTTP transport settings used by the bundled fetcher
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Notifier options are never rejected here: the resolver accepts any
    /// combination. Only the transport settings can be unusable.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.http.base_url)
            .map_err(|e| AppError::validation(format!("http.base_url is invalid: {e}")))?;
        Ok(())
    }
}

/// How the user is asked whether to reload once an update is detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyType {
    /// Ask through the host's confirmation prompt
    #[default]
    Confirm,
    /// Ask through the caller-supplied update callback
    Custom,
}

/// Partial notifier options. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierOptions {
    /// Polling interval in milliseconds. Absent means 10000; `0` disables
    /// automatic polling (manual mode).
    pub polling_interval: Option<u64>,

    /// Notification style (default `confirm`)
    pub notify_type: Option<NotifyType>,

    /// Pause checks while the page is hidden (default true, polling only)
    pub pause_on_hidden: Option<bool>,

    /// Start polling on construction (default true, polling only)
    pub immediate: Option<bool>,

    /// Path of the reference document (default `/`)
    pub index_path: Option<String>,

    /// Extraction pattern; must define a named group `src`
    pub script_pattern: Option<String>,

    /// Log the notifier's internal steps at info level
    pub debug: Option<bool>,

    /// Text shown by the confirmation prompt
    pub prompt_message: Option<String>,
}

impl NotifierOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll every `millis` milliseconds. `0` selects manual mode.
    pub fn polling_interval(mut self, millis: u64) -> Self {
        self.polling_interval = Some(millis);
        self
    }

    /// Disable automatic polling; checks are driven by the caller.
    pub fn manual(mut self) -> Self {
        self.polling_interval = Some(0);
        self
    }

    pub fn notify_type(mut self, notify_type: NotifyType) -> Self {
        self.notify_type = Some(notify_type);
        self
    }

    pub fn pause_on_hidden(mut self, pause: bool) -> Self {
        self.pause_on_hidden = Some(pause);
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = Some(immediate);
        self
    }

    pub fn index_path(mut self, path: impl Into<String>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    pub fn script_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.script_pattern = Some(pattern.into());
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn prompt_message(mut self, message: impl Into<String>) -> Self {
        self.prompt_message = Some(message.into());
        self
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Origin the reference path is resolved against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

mod defaults {
    pub fn base_url() -> String {
        "http://localhost:8080".into()
    }
    pub fn user_agent() -> String {
        concat!("Mozilla/5.0 (compatible; update-notifier/", env!("CARGO_PKG_VERSION"), ")").into()
    }
    pub fn timeout() -> u64 {
        10
    }
}
