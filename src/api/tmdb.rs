//! TMDB (The Movie Database) API client
//!
//! Provides title metadata used to seed progress records, and builds
//! image URLs for poster/backdrop paths.
//! API docs: https://developer.themoviedb.org/docs

use anyhow::Result;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{http_client, BROWSER_USER_AGENT};
use crate::models::{MediaType, MovieDetail, TitleMetadata, TvDetail};

/// Default TMDB image CDN prefix
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";
pub const POSTER_SIZE: &str = "w500";
pub const BACKDROP_SIZE: &str = "original";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TMDB API error types
#[derive(Error, Debug)]
pub enum TmdbError {
    #[error("Resource not found (404)")]
    NotFound,

    #[error("Rate limited (429), retries exhausted")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Build a full image URL from a TMDB file path like `/abc.jpg`.
///
/// Absolute URLs pass through untouched; empty paths yield `None`.
pub fn image_url(base_url: &str, size: &str, path: Option<&str>) -> Option<String> {
    let path = path?.trim();
    if path.is_empty() {
        return None;
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    let sep = if path.starts_with('/') { "" } else { "/" };
    Some(format!(
        "{}/{}{}{}",
        base_url.trim_end_matches('/'),
        size,
        sep,
        path
    ))
}

/// TMDB API client
pub struct TmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl TmdbClient {
    /// Create a new TMDB client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.themoviedb.org/3")
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: http_client(BROWSER_USER_AGENT, Some(REQUEST_TIMEOUT)),
            max_retries: 3,
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.client = http_client(user_agent, Some(REQUEST_TIMEOUT));
        self
    }

    /// Query URL for a title's details
    pub fn detail_url(&self, id: u64, media_type: MediaType) -> String {
        format!("{}/{}/{}", self.base_url, media_type.as_str(), id)
    }

    /// Make an authenticated GET request with retry logic for rate limits
    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let mut retries = 0;

        loop {
            let mut request = self.client.get(url).header("Accept", "application/json");
            // v4 read tokens are JWTs; v3 keys go in the query string
            request = if self.api_key.starts_with("eyJ") {
                request.header("Authorization", format!("Bearer {}", self.api_key))
            } else {
                request.query(&[("api_key", self.api_key.as_str())])
            };

            let response = request.send().await.map_err(TmdbError::from)?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await.map_err(TmdbError::from)?;
                    let parsed: T = serde_json::from_str(&body).map_err(|e| {
                        TmdbError::InvalidResponse(format!("JSON parse error: {}", e))
                    })?;
                    return Ok(parsed);
                }
                StatusCode::NOT_FOUND => {
                    return Err(TmdbError::NotFound.into());
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(TmdbError::RateLimited.into());
                    }

                    // Get Retry-After header or default to exponential backoff
                    let wait_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(2u64.pow(retries));

                    warn!(url, wait_secs, "TMDB rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                    continue;
                }
                status => {
                    return Err(TmdbError::ServerError(status.as_u16()).into());
                }
            }
        }
    }

    /// Get movie details by ID
    pub async fn movie_detail(&self, id: u64) -> Result<MovieDetail> {
        let url = self.detail_url(id, MediaType::Movie);
        let response: MovieResponse = self.get(&url).await?;
        debug!(id, "Fetched movie detail");
        Ok(response.into_detail())
    }

    /// Get TV show details by ID
    pub async fn tv_detail(&self, id: u64) -> Result<TvDetail> {
        let url = self.detail_url(id, MediaType::Tv);
        let response: TvResponse = self.get(&url).await?;
        debug!(id, "Fetched tv detail");
        Ok(response.into_detail())
    }

    /// Display metadata for seeding a progress record
    pub async fn title_metadata(&self, id: u64, media_type: MediaType) -> Result<TitleMetadata> {
        Ok(match media_type {
            MediaType::Movie => self.movie_detail(id).await?.into(),
            MediaType::Tv => self.tv_detail(id).await?.into(),
        })
    }
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
struct MovieResponse {
    id: u64,
    title: String,
    release_date: Option<String>,
    runtime: Option<u32>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
}

impl MovieResponse {
    fn into_detail(self) -> MovieDetail {
        let year = self
            .release_date
            .as_ref()
            .and_then(|d| extract_year(d))
            .unwrap_or(0);

        MovieDetail {
            id: self.id,
            title: self.title,
            year,
            runtime: self.runtime.unwrap_or(0),
            overview: self.overview.unwrap_or_default(),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TvResponse {
    id: u64,
    name: String,
    first_air_date: Option<String>,
    number_of_seasons: Option<u32>,
    number_of_episodes: Option<u32>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
}

impl TvResponse {
    fn into_detail(self) -> TvDetail {
        let year = self
            .first_air_date
            .as_ref()
            .and_then(|d| extract_year(d))
            .unwrap_or(0);

        TvDetail {
            id: self.id,
            name: self.name,
            year,
            number_of_seasons: self.number_of_seasons,
            number_of_episodes: self.number_of_episodes,
            overview: self.overview.unwrap_or_default(),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
        }
    }
}

/// Extract year from a date string like "2022-03-04"
fn extract_year(date: &str) -> Option<u16> {
    date.get(..4)?.parse().ok()
}
