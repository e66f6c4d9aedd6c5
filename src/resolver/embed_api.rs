//! Provider A: token-based embed API
//!
//! 1. Fetch `{base}/embed/movie/{id}` or `{base}/embed/tv/{id}/{season}/{episode}`
//! 2. Pull the session token out of the page's `data-id="..."` attribute
//! 3. List sources at `{base}/ajax/embed/episode/{token}/sources`
//! 4. Resolve the first source at `{base}/ajax/embed/source/{source_id}`
//!
//! The whole exchange shares one time budget. The site rejects requests
//! without a matching `Referer`/`Origin`.

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ORIGIN, REFERER};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use super::{require_episode, ProviderError, StreamProvider};
use crate::api::{http_client, BROWSER_USER_AGENT};
use crate::models::{MediaType, StreamRequest};

/// Overall budget for the four-step exchange
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    result: Option<Vec<SourceEntry>>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SourceResponse {
    #[serde(default)]
    result: Option<ResolvedSource>,
}

#[derive(Debug, Deserialize)]
struct ResolvedSource {
    url: Option<String>,
}

pub struct EmbedApiProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
    budget: Duration,
}

impl EmbedApiProvider {
    pub fn new() -> Self {
        Self::with_base_url("https://vidsrc.to")
    }

    /// Create a provider against a custom host (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            name: "A".to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(BROWSER_USER_AGENT, None),
            budget: DEFAULT_BUDGET,
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.client = http_client(user_agent, None);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Embed page for the request
    pub fn embed_url(&self, request: &StreamRequest) -> Result<String, ProviderError> {
        Ok(match request.media_type {
            MediaType::Movie => format!("{}/embed/movie/{}", self.base_url, request.id),
            MediaType::Tv => {
                let (season, episode) = require_episode(request)?;
                format!(
                    "{}/embed/tv/{}/{}/{}",
                    self.base_url, request.id, season, episode
                )
            }
        })
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .get(url)
            .header(REFERER, format!("{}/", self.base_url))
            .header(ORIGIN, &self.base_url)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let body = self.fetch(url).await?.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("JSON parse error: {}", e)))
    }

    async fn run(&self, request: &StreamRequest) -> Result<Option<String>, ProviderError> {
        let page = self.fetch(&self.embed_url(request)?).await?.text().await?;

        let Some(token) = extract_token(&page) else {
            debug!(%request, "No session token on embed page");
            return Ok(None);
        };

        let listing: SourcesResponse = self
            .fetch_json(&format!(
                "{}/ajax/embed/episode/{}/sources",
                self.base_url, token
            ))
            .await?;
        let Some(source) = listing.result.unwrap_or_default().into_iter().next() else {
            debug!(%request, "Empty source listing");
            return Ok(None);
        };

        let resolved: SourceResponse = self
            .fetch_json(&format!("{}/ajax/embed/source/{}", self.base_url, source.id))
            .await?;

        Ok(resolved
            .result
            .and_then(|r| r.url)
            .filter(|url| !url.trim().is_empty()))
    }
}

impl Default for EmbedApiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamProvider for EmbedApiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, request: &StreamRequest) -> Result<Option<String>, ProviderError> {
        tokio::time::timeout(self.budget, self.run(request))
            .await
            .map_err(|_| ProviderError::Timeout(self.budget))?
    }
}

/// Session token from the embed page's `data-id` attribute
pub fn extract_token(page: &str) -> Option<String> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    let re = TOKEN
        .get_or_init(|| Regex::new(r#"data-id="([^"]+)""#).ok())
        .as_ref()?;
    re.captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
