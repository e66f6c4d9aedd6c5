//! API clients for external services
//!
//! - TMDB: Movie/TV metadata and image URLs

pub mod tmdb;

pub use tmdb::TmdbClient;

use std::time::Duration;

/// Browser-like identification sent with every outbound request
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP client identifying as `user_agent`, with an optional request timeout
pub(crate) fn http_client(user_agent: &str, timeout: Option<Duration>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder().user_agent(user_agent);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_default()
}
