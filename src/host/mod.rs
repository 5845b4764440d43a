//! Capabilities the notifier borrows from its host environment.
//!
//! The core never talks to a browser, a terminal or a network stack directly.
//! The embedding application hands over:
//!
//! - a [`Fetcher`] that retrieves the reference document as text
//! - a [`Prompt`] that asks the user whether to reload
//! - a [`Reloader`] that replaces the current page
//! - optionally, a watch channel carrying the page [`Visibility`]

pub mod http;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;

pub use http::HttpFetcher;

/// Retrieves a document body as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` (a path or absolute URL) and return the body.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Default confirmation dialog.
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Show `message`; `true` means the user accepted the reload.
    async fn confirm(&self, message: &str) -> bool;
}

/// Discards and reloads the current page.
pub trait Reloader: Send + Sync {
    fn reload(&self);
}

/// Page visibility as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_hidden(self) -> bool {
        self == Visibility::Hidden
    }
}

/// Bundle of host capabilities handed to a notifier.
#[derive(Clone)]
pub struct Host {
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) prompt: Arc<dyn Prompt>,
    pub(crate) reloader: Arc<dyn Reloader>,
    pub(crate) visibility: Option<watch::Receiver<Visibility>>,
}

impl Host {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        prompt: Arc<dyn Prompt>,
        reloader: Arc<dyn Reloader>,
    ) -> Self {
        Self {
            fetcher,
            prompt,
            reloader,
            visibility: None,
        }
    }

    /// Attach a visibility signal. Without one the page counts as always
    /// visible.
    pub fn with_visibility(mut self, visibility: watch::Receiver<Visibility>) -> Self {
        self.visibility = Some(visibility);
        self
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("visibility", &self.visibility.as_ref().map(|rx| *rx.borrow()))
            .finish_non_exhaustive()
    }
}
