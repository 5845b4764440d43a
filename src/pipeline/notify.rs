//! Notification protocol.
//!
//! Runs once the diff engine reports an update: fire the detection callback,
//! obtain a reload decision, and reload if the decision is positive.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::host::{Prompt, Reloader};
use crate::models::NotifyType;
use crate::pipeline::resolve::ResolvedConfig;
use crate::utils::trace;

/// Caller-supplied reload decision, possibly deferred.
pub type UpdateCallback = Arc<dyn Fn() -> BoxFuture<'static, Result<bool>> + Send + Sync>;

/// Caller-supplied "update detected" hook.
pub type DetectedCallback = Arc<dyn Fn() + Send + Sync>;

/// Optional caller hooks.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub(crate) on_update: Option<UpdateCallback>,
    pub(crate) on_detected: Option<DetectedCallback>,
}

impl Callbacks {
    /// Decide whether to reload. Used when the notify type is `custom`.
    pub fn on_update<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        self.on_update = Some(Arc::new(move || callback().boxed()));
        self
    }

    /// Called every time an update is detected, before any prompt.
    pub fn on_detected<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_detected = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_update", &self.on_update.is_some())
            .field("on_detected", &self.on_detected.is_some())
            .finish()
    }
}

/// How a notification ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The page was reloaded.
    Reloaded,
    /// The user declined; polling may resume.
    Declined,
}

/// Everything the protocol needs, cloned out of the resolved config.
#[derive(Clone)]
pub struct Notification {
    notify_type: NotifyType,
    prompt_message: String,
    debug: bool,
    callbacks: Callbacks,
    prompt: Arc<dyn Prompt>,
    reloader: Arc<dyn Reloader>,
}

impl Notification {
    pub fn new(
        config: &ResolvedConfig,
        callbacks: Callbacks,
        prompt: Arc<dyn Prompt>,
        reloader: Arc<dyn Reloader>,
    ) -> Self {
        Self {
            notify_type: config.notify_type,
            prompt_message: config.prompt_message.clone(),
            debug: config.debug,
            callbacks,
            prompt,
            reloader,
        }
    }

    /// Run the protocol. Errors come only from the update callback.
    pub async fn run(&self) -> Result<Decision> {
        if let Some(on_detected) = &self.callbacks.on_detected {
            on_detected();
        }

        let reload = match (&self.notify_type, &self.callbacks.on_update) {
            (NotifyType::Custom, Some(on_update)) => on_update().await?,
            _ => self.prompt.confirm(&self.prompt_message).await,
        };

        if reload {
            trace::step(self.debug, format_args!("Reload accepted, reloading page"));
            self.reloader.reload();
            Ok(Decision::Reloaded)
        } else {
            trace::step(self.debug, format_args!("Reload declined"));
            Ok(Decision::Declined)
        }
    }
}
