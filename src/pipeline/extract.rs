//! Fingerprint extractor.
//!
//! Fetches the reference document with a cache-busting query and collects the
//! `src` group of every pattern match, in document order.

use std::sync::Arc;

use chrono::Utc;
use regex::Regex;

use crate::host::Fetcher;
use crate::models::Fingerprint;
use crate::pipeline::resolve::{ResolvedConfig, SRC_GROUP};
use crate::utils::{cache_busted_url, trace};

/// Extracts asset fingerprints from the reference document.
#[derive(Clone)]
pub struct FingerprintExtractor {
    fetcher: Arc<dyn Fetcher>,
    index_path: String,
    pattern: Option<Regex>,
    debug: bool,
}

impl FingerprintExtractor {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &ResolvedConfig) -> Self {
        Self {
            fetcher,
            index_path: config.index_path.clone(),
            pattern: config.pattern.clone(),
            debug: config.debug,
        }
    }

    /// Fetch and scan the reference document.
    ///
    /// Transport failures are logged and produce an empty fingerprint.
    pub async fn extract(&self) -> Fingerprint {
        let url = cache_busted_url(&self.index_path, Utc::now().timestamp_millis());
        trace::step(self.debug, format_args!("Requesting {url}"));

        let document = match self.fetcher.fetch(&url).await {
            Ok(document) => document,
            Err(e) => {
                log::error!("[UpdateNotifier] Failed to fetch reference document {url}: {e}");
                return Fingerprint::default();
            }
        };

        let fingerprint = self.scan(&document);
        trace::step(
            self.debug,
            format_args!(
                "Extracted {} asset(s) [{}]: {:?}",
                fingerprint.len(),
                fingerprint.digest(),
                &*fingerprint
            ),
        );
        fingerprint
    }

    /// Scan a document with the configured pattern.
    pub fn scan(&self, document: &str) -> Fingerprint {
        match &self.pattern {
            Some(pattern) => scan(pattern, document),
            None => Fingerprint::default(),
        }
    }
}

/// Collect the `src` group of every non-overlapping match, in order.
///
/// Each call scans from the start of `document`; no match position carries
/// over between calls.
pub fn scan(pattern: &Regex, document: &str) -> Fingerprint {
    pattern
        .captures_iter(document)
        .filter_map(|caps| caps.name(SRC_GROUP))
        .map(|m| m.as_str().to_string())
        .collect()
}
