//! In-memory host fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::host::{Fetcher, Host, Prompt, Reloader};

type Response = std::result::Result<String, String>;

/// Serves queued documents; the last one keeps being served once the queue
/// runs dry.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new<'a>(
        responses: impl IntoIterator<Item = std::result::Result<&'a str, &'a str>>,
    ) -> Arc<Self> {
        let fetcher = Self::default();
        fetcher.replace(responses);
        Arc::new(fetcher)
    }

    /// Serve a page whose scripts are `assets`.
    pub fn page(assets: &[&str]) -> String {
        assets
            .iter()
            .map(|a| format!("<script src=\"{a}\"></script>\n"))
            .collect()
    }

    /// Replace the remaining queue.
    pub fn replace<'a>(
        &self,
        responses: impl IntoIterator<Item = std::result::Result<&'a str, &'a str>>,
    ) {
        let mut queue = self.responses.lock().unwrap();
        queue.clear();
        queue.extend(
            responses
                .into_iter()
                .map(|r| r.map(str::to_string).map_err(str::to_string)),
        );
    }

    /// Serve the given script list from now on.
    pub fn serve(&self, assets: &[&str]) {
        let page = Self::page(assets);
        self.replace([Ok(page.as_str())]);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        let mut queue = self.responses.lock().unwrap();
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match response {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(AppError::fetch(url, message)),
            None => Err(AppError::fetch(url, "no scripted response")),
        }
    }
}

/// Answers every confirmation with a fixed decision.
pub struct FixedPrompt {
    answer: bool,
    messages: Mutex<Vec<String>>,
}

impl FixedPrompt {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompt for FixedPrompt {
    async fn confirm(&self, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        self.answer
    }
}

#[derive(Default)]
pub struct CountingReloader {
    reloads: AtomicUsize,
}

impl CountingReloader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl Reloader for CountingReloader {
    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fakes wired into a [`Host`].
pub struct Fakes {
    pub fetcher: Arc<ScriptedFetcher>,
    pub prompt: Arc<FixedPrompt>,
    pub reloader: Arc<CountingReloader>,
}

impl Fakes {
    pub fn new(assets: &[&str], answer: bool) -> Self {
        let page = ScriptedFetcher::page(assets);
        Self {
            fetcher: ScriptedFetcher::new([Ok(page.as_str())]),
            prompt: FixedPrompt::new(answer),
            reloader: CountingReloader::new(),
        }
    }

    pub fn host(&self) -> Host {
        Host::new(
            self.fetcher.clone(),
            self.prompt.clone(),
            self.reloader.clone(),
        )
    }
}
