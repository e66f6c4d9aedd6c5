//! Configuration management for streamshelf
//!
//! Handles config file loading/saving and API key lookup.
//! Config is stored at ~/.config/streamshelf/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::api::tmdb::IMAGE_BASE_URL;
use crate::api::BROWSER_USER_AGENT;
use crate::progress::{ProgressStore, DEFAULT_CACHE_TTL};
use crate::resolver::{EmbedApiProvider, PageScanProvider, StreamResolver};
use crate::storage::FileStore;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TMDB API key (v3 key or v4 read token)
    pub tmdb_api_key: Option<String>,
    /// Directory holding the progress ledger
    pub data_dir: Option<PathBuf>,
    /// Read cache lifetime in milliseconds
    pub cache_ttl_ms: Option<u64>,
    /// Host of the token/ajax embed provider
    pub provider_a_url: Option<String>,
    /// Host of the page-scan embed provider
    pub provider_b_url: Option<String>,
    /// Image CDN prefix for poster/backdrop URLs
    pub image_base_url: Option<String>,
    /// User-Agent for TMDB, provider and probe requests
    pub user_agent: Option<String>,
}

impl Config {
    /// Get config file path (~/.config/streamshelf/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("streamshelf").join("config.toml"))
    }

    /// Load config from the default location, or return default if not found
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load config from an explicit file; missing or invalid files yield defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// TMDB API key: environment variable TMDB_API_KEY, then the config file
    pub fn tmdb_api_key(&self) -> Option<String> {
        std::env::var("TMDB_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.tmdb_api_key.clone())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(FileStore::default_dir)
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CACHE_TTL)
    }

    pub fn image_base_url(&self) -> &str {
        self.image_base_url.as_deref().unwrap_or(IMAGE_BASE_URL)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or(BROWSER_USER_AGENT)
    }

    /// Progress ledger backed by `<data_dir>/streamshelf_continue_watching.json`
    pub fn progress_store(&self) -> ProgressStore<FileStore> {
        ProgressStore::new(FileStore::new(self.data_dir()))
            .with_cache_ttl(self.cache_ttl())
            .with_image_base_url(self.image_base_url())
    }

    /// Provider A then provider B, honouring host overrides
    pub fn stream_resolver(&self) -> StreamResolver {
        let a = match &self.provider_a_url {
            Some(url) => EmbedApiProvider::with_base_url(url.as_str()),
            None => EmbedApiProvider::new(),
        }
        .with_user_agent(self.user_agent());
        let b = match &self.provider_b_url {
            Some(url) => PageScanProvider::with_base_url(url.as_str()),
            None => PageScanProvider::new(),
        }
        .with_user_agent(self.user_agent());
        StreamResolver::new(vec![Box::new(a), Box::new(b)]).with_user_agent(self.user_agent())
    }
}
