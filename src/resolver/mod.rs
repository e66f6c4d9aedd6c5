//! Stream URL resolution
//!
//! A [`StreamResolver`] walks an ordered list of [`StreamProvider`]s and
//! returns the first playable URL. Providers are tried one at a time; a
//! provider that errors is logged and treated as having found nothing.
//!
//! - `embed_api`: token + ajax source listing protocol (provider A)
//! - `page_scan`: raw page scan for media URLs (provider B)

pub mod embed_api;
pub mod page_scan;

pub use embed_api::EmbedApiProvider;
pub use page_scan::{find_stream_url, PageScanProvider};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{http_client, BROWSER_USER_AGENT};
use crate::models::{MediaType, ResolvedStream, StreamRequest};

/// Default budget for reachability probes
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Provider error types
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned HTTP {0}")]
    Status(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Season and episode are required for tv requests")]
    MissingEpisode,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// One embed site able to turn a title into a direct media URL
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Label reported in [`ResolvedStream::provider`]
    fn name(&self) -> &str;

    /// `Ok(None)` means the provider has nothing for this title
    async fn resolve(&self, request: &StreamRequest) -> Result<Option<String>, ProviderError>;
}

/// Ordered provider fallback chain
pub struct StreamResolver {
    providers: Vec<Box<dyn StreamProvider>>,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl StreamResolver {
    pub fn new(providers: Vec<Box<dyn StreamProvider>>) -> Self {
        Self {
            providers,
            client: http_client(BROWSER_USER_AGENT, None),
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    /// Identify probe requests as `user_agent`
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.client = http_client(user_agent, None);
        self
    }

    /// Provider A followed by provider B, against their public hosts
    pub fn with_default_providers() -> Self {
        Self::new(vec![
            Box::new(EmbedApiProvider::new()),
            Box::new(PageScanProvider::new()),
        ])
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name())
    }

    /// First URL any provider yields, or `None` once every provider is exhausted
    pub async fn resolve(&self, request: &StreamRequest) -> Option<ResolvedStream> {
        for provider in &self.providers {
            match provider.resolve(request).await {
                Ok(Some(url)) => {
                    info!(provider = provider.name(), %request, "Resolved stream");
                    return Some(ResolvedStream {
                        url,
                        provider: provider.name().to_string(),
                    });
                }
                Ok(None) => {
                    debug!(provider = provider.name(), %request, "Provider found nothing");
                }
                Err(e) => {
                    warn!(provider = provider.name(), %request, error = %e, "Provider failed");
                }
            }
        }

        warn!(%request, "All providers exhausted");
        None
    }

    /// HEAD the URL and report whether it answered with a success status.
    ///
    /// Any error, including the timeout, reads as unreachable.
    pub async fn probe(&self, url: &str) -> bool {
        let request = self.client.head(url).timeout(self.probe_timeout).send();
        match request.await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url, error = %e, "Probe failed");
                false
            }
        }
    }
}

/// Season/episode pair of a tv request, or the provider error when missing
pub(crate) fn require_episode(request: &StreamRequest) -> Result<(u32, u32), ProviderError> {
    match (request.media_type, request.season, request.episode) {
        (MediaType::Tv, Some(season), Some(episode)) => Ok((season, episode)),
        _ => Err(ProviderError::MissingEpisode),
    }
}
