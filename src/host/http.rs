// src/host/http.rs

//! reqwest-backed document fetcher.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::host::Fetcher;
use crate::models::HttpConfig;
use crate::utils::http::create_async_client;

/// Fetches reference documents over HTTP, resolving request paths against a
/// base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
}

impl HttpFetcher {
    /// Create a fetcher from the transport settings.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self { client, base_url })
    }

    /// Absolute URL for a request path.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        Ok(self.base_url.join(url)?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let target = self.resolve(url)?;
        let response = self
            .client
            .get(target.clone())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::fetch(target.as_str(), e))?;
        Ok(response.text().await?)
    }
}
