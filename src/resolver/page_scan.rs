//! Provider B: scan an embed page for a media URL
//!
//! Fetches `{base}/embed/{id}` (movies) or `{base}/embedtv/{id}&s={season}&e={episode}`
//! and searches the raw body for an absolute `.m3u8` URL, falling back to `.mp4`.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use super::{require_episode, ProviderError, StreamProvider};
use crate::api::{http_client, BROWSER_USER_AGENT};
use crate::models::{MediaType, StreamRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct PageScanProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl PageScanProvider {
    pub fn new() -> Self {
        Self::with_base_url("https://www.2embed.cc")
    }

    /// Create a provider against a custom host (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            name: "B".to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(BROWSER_USER_AGENT, Some(REQUEST_TIMEOUT)),
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.client = http_client(user_agent, Some(REQUEST_TIMEOUT));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn embed_url(&self, request: &StreamRequest) -> Result<String, ProviderError> {
        Ok(match request.media_type {
            MediaType::Movie => format!("{}/embed/{}", self.base_url, request.id),
            MediaType::Tv => {
                let (season, episode) = require_episode(request)?;
                format!(
                    "{}/embedtv/{}&s={}&e={}",
                    self.base_url, request.id, season, episode
                )
            }
        })
    }
}

impl Default for PageScanProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamProvider for PageScanProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, request: &StreamRequest) -> Result<Option<String>, ProviderError> {
        let response = self.client.get(self.embed_url(request)?).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(find_stream_url(&body))
    }
}

/// First absolute HLS playlist URL in `body`, else the first MP4 URL
pub fn find_stream_url(body: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r#"https?://[^\s"'<>]+?\.m3u8"#,
            r#"https?://[^\s"'<>]+?\.mp4"#,
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });

    patterns
        .iter()
        .find_map(|re| re.find(body))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_playlist_over_file() {
        let body = r#"
            <source src="https://cdn.test/movie.mp4">
            <script>var file = "https://cdn.test/hls/master.m3u8";</script>
        "#;
        assert_eq!(
            find_stream_url(body).as_deref(),
            Some("https://cdn.test/hls/master.m3u8")
        );
    }

    #[test]
    fn test_falls_back_to_file() {
        let body = r#"<video src='http://cdn.test/a/b/movie.mp4'></video>"#;
        assert_eq!(
            find_stream_url(body).as_deref(),
            Some("http://cdn.test/a/b/movie.mp4")
        );
    }

    #[test]
    fn test_stops_at_first_extension() {
        let body = r#"src="https://cdn.test/a.m3u8?r=https://x.test/b.m3u8""#;
        assert_eq!(
            find_stream_url(body).as_deref(),
            Some("https://cdn.test/a.m3u8")
        );
    }

    #[test]
    fn test_ignores_relative_urls() {
        assert_eq!(find_stream_url(r#"<a href="/hls/master.m3u8">"#), None);
        assert_eq!(find_stream_url("no media here"), None);
    }

    #[test]
    fn test_embed_urls() {
        let provider = PageScanProvider::with_base_url("https://scan.test");
        assert_eq!(
            provider.embed_url(&StreamRequest::movie(550)).unwrap(),
            "https://scan.test/embed/550"
        );
        assert_eq!(
            provider.embed_url(&StreamRequest::episode(1396, 1, 2)).unwrap(),
            "https://scan.test/embedtv/1396&s=1&e=2"
        );
    }
}
