//! Data structures and types for streamshelf
//!
//! Contains all shared models used across the crate organized by domain:
//! - **Catalog**: TMDB media details used to seed records
//! - **Progress**: persisted watch-progress records and their display projection
//! - **Streams**: resolver requests and resolved stream URLs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Catalog Models (TMDB)
// =============================================================================

/// Media type discriminator shared by records, requests and catalog lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Wire name used in persisted records and URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Movie => write!(f, "Movie"),
            MediaType::Tv => write!(f, "TV Show"),
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(format!("Invalid media type: {:?} (expected movie or tv)", other)),
        }
    }
}

/// Detailed movie information from TMDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    pub title: String,
    pub year: u16,
    pub runtime: u32,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

impl fmt::Display for MovieDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.runtime / 60;
        let mins = self.runtime % 60;
        write!(f, "{} ({}) - {}h {}m", self.title, self.year, hours, mins)
    }
}

/// Detailed TV show information from TMDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvDetail {
    pub id: u64,
    pub name: String,
    pub year: u16,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

impl fmt::Display for TvDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - {} seasons",
            self.name,
            self.year,
            self.number_of_seasons.unwrap_or(0)
        )
    }
}

/// Display metadata used to seed a new progress record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleMetadata {
    pub title: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
}

impl From<MovieDetail> for TitleMetadata {
    fn from(detail: MovieDetail) -> Self {
        Self {
            title: detail.title,
            poster_path: detail.poster_path,
            backdrop_path: detail.backdrop_path,
            number_of_seasons: None,
            number_of_episodes: None,
        }
    }
}

impl From<TvDetail> for TitleMetadata {
    fn from(detail: TvDetail) -> Self {
        Self {
            title: detail.name,
            poster_path: detail.poster_path,
            backdrop_path: detail.backdrop_path,
            number_of_seasons: detail.number_of_seasons,
            number_of_episodes: detail.number_of_episodes,
        }
    }
}

// =============================================================================
// Progress Models
// =============================================================================

/// Seconds watched out of total duration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WatchProgress {
    pub watched: f64,
    pub duration: f64,
}

impl WatchProgress {
    pub fn percent(&self) -> u8 {
        progress_percent(self.watched, self.duration)
    }
}

/// Per-episode entry inside a TV record's `show_progress` map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeEntry {
    pub season: u32,
    pub episode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<WatchProgress>,
    #[serde(default)]
    pub last_updated: i64,
}

/// Fields shared by every record regardless of media type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordMeta {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    /// Epoch milliseconds; missing values decode as 0
    #[serde(default)]
    pub last_updated: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_seasons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_episodes: Option<u32>,
}

impl RecordMeta {
    /// Seed record metadata from catalog details
    pub fn from_metadata(id: u64, metadata: &TitleMetadata, last_updated: i64) -> Self {
        Self {
            id,
            title: metadata.title.clone(),
            poster_path: metadata.poster_path.clone(),
            backdrop_path: metadata.backdrop_path.clone(),
            last_updated,
            number_of_seasons: metadata.number_of_seasons,
            number_of_episodes: metadata.number_of_episodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<WatchProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvRecord {
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Keyed by [`episode_key`]
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub show_progress: BTreeMap<String, EpisodeEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_season_watched: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_episode_watched: Option<String>,
}

impl TvRecord {
    /// Season/episode of the last watched episode, if both are positive integers
    pub fn last_watched(&self) -> Option<(u32, u32)> {
        let season = parse_positive(self.last_season_watched.as_deref())?;
        let episode = parse_positive(self.last_episode_watched.as_deref())?;
        Some((season, episode))
    }
}

/// One tracked title in the continue-watching ledger
///
/// Persisted as a flat JSON object with a `type` tag, e.g.
/// `{"id":5,"type":"movie","title":"X","last_updated":200,"progress":{..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressRecord {
    Movie(MovieRecord),
    Tv(TvRecord),
}

impl ProgressRecord {
    pub fn meta(&self) -> &RecordMeta {
        match self {
            ProgressRecord::Movie(m) => &m.meta,
            ProgressRecord::Tv(t) => &t.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut RecordMeta {
        match self {
            ProgressRecord::Movie(m) => &mut m.meta,
            ProgressRecord::Tv(t) => &mut t.meta,
        }
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            ProgressRecord::Movie(_) => MediaType::Movie,
            ProgressRecord::Tv(_) => MediaType::Tv,
        }
    }

    pub fn id(&self) -> u64 {
        self.meta().id
    }

    pub fn last_updated(&self) -> i64 {
        self.meta().last_updated
    }

    /// Unique ledger key
    pub fn key(&self) -> (MediaType, u64) {
        (self.media_type(), self.id())
    }

    /// A record needs a non-zero id and a non-blank title to be persisted
    pub fn is_valid(&self) -> bool {
        let meta = self.meta();
        meta.id != 0 && !meta.title.trim().is_empty()
    }

    /// Progress relevant for display: the movie itself, or the last watched episode
    pub fn current_progress(&self) -> Option<WatchProgress> {
        match self {
            ProgressRecord::Movie(m) => m.progress,
            ProgressRecord::Tv(t) => {
                let (season, episode) = t.last_watched()?;
                t.show_progress
                    .get(&episode_key(season, episode))
                    .and_then(|e| e.progress)
            }
        }
    }
}

/// Continue-watching row with resolved image URLs and computed percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayItem {
    pub id: u64,
    pub media_type: MediaType,
    pub title: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub progress_percent: u8,
    pub last_season_watched: Option<u32>,
    pub last_episode_watched: Option<u32>,
    pub number_of_seasons: Option<u32>,
    pub number_of_episodes: Option<u32>,
    pub last_updated: i64,
}

impl fmt::Display for DisplayItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.last_season_watched, self.last_episode_watched) {
            (Some(s), Some(e)) => write!(
                f,
                "{} S{:02}E{:02} - {}%",
                self.title, s, e, self.progress_percent
            ),
            _ => write!(f, "{} - {}%", self.title, self.progress_percent),
        }
    }
}

/// Stored progress of a single movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovieProgress {
    pub watched: f64,
    pub duration: f64,
    pub progress_percent: u8,
}

/// Stored progress of a single TV episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeProgress {
    pub watched: f64,
    pub duration: f64,
    pub progress_percent: u8,
    pub last_updated: i64,
}

/// Playback position reported by the host player
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackUpdate {
    pub current_time: f64,
    pub duration: f64,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

// =============================================================================
// Stream Models
// =============================================================================

/// Title to resolve into a playable URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub id: u64,
    pub media_type: MediaType,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl StreamRequest {
    pub fn movie(id: u64) -> Self {
        Self {
            id,
            media_type: MediaType::Movie,
            season: None,
            episode: None,
        }
    }

    pub fn episode(id: u64, season: u32, episode: u32) -> Self {
        Self {
            id,
            media_type: MediaType::Tv,
            season: Some(season),
            episode: Some(episode),
        }
    }
}

impl fmt::Display for StreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.media_type, self.season, self.episode) {
            (MediaType::Tv, Some(s), Some(e)) => write!(f, "tv/{} S{:02}E{:02}", self.id, s, e),
            _ => write!(f, "{}/{}", self.media_type.as_str(), self.id),
        }
    }
}

/// Direct media URL plus the provider that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStream {
    pub url: String,
    pub provider: String,
}

// =============================================================================
// Utility Functions
// =============================================================================

/// `round(watched / duration * 100)` clamped to 0..=100; 0 when duration is not positive
pub fn progress_percent(watched: f64, duration: f64) -> u8 {
    if !duration.is_finite() || duration <= 0.0 || !watched.is_finite() {
        return 0;
    }
    (watched / duration * 100.0).round().clamp(0.0, 100.0) as u8
}

/// `show_progress` key for an episode, e.g. `s2e3`
pub fn episode_key(season: u32, episode: u32) -> String {
    format!("s{}e{}", season, episode)
}

/// Parse a string-encoded positive integer
pub fn parse_positive(value: Option<&str>) -> Option<u32> {
    value?.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================
