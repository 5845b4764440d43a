//! Utility functions and helpers.

pub mod http;
pub mod trace;

/// Append a cache-defeating `timestamp` query parameter to `path`.
///
/// An empty path is treated as the site root.
pub fn cache_busted_url(path: &str, timestamp_ms: i64) -> String {
    let path = if path.is_empty() { "/" } else { path };
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}timestamp={timestamp_ms}")
}
