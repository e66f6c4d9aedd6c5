//! Continue-watching ledger
//!
//! One JSON array of [`ProgressRecord`]s lives under a single storage key.
//! Reads go through a short-lived [`TtlCache`]; every write replaces the whole
//! array and refreshes the cache. Public operations never return errors:
//! failures are logged and degrade to empty/false results.

mod cache;

pub use cache::TtlCache;

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

use crate::api::tmdb::{image_url, BACKDROP_SIZE, IMAGE_BASE_URL, POSTER_SIZE};
use crate::models::{
    episode_key, DisplayItem, EpisodeEntry, EpisodeProgress, MediaType, MovieProgress,
    MovieRecord, PlaybackUpdate, ProgressRecord, RecordMeta, TitleMetadata, TvRecord,
    WatchProgress,
};
use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the serialized ledger
pub const STORAGE_KEY: &str = "streamshelf:continue_watching";

/// How long a read stays fresh before storage is consulted again
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(5000);

/// Internal failures; never escape the public API
#[derive(Error, Debug)]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Corrupt ledger payload: {0}")]
    Corrupt(String),
}

/// Result of [`ProgressStore::remove_item`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoveOutcome {
    /// Record removed; `remaining` is the size of the persisted ledger
    Removed {
        record: ProgressRecord,
        remaining: usize,
    },
    /// Nothing stored under that key
    NotFound,
    /// Bad arguments or the ledger could not be written
    Failed { reason: String },
}

impl RemoveOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, RemoveOutcome::Failed { .. })
    }
}

/// Persisted, deduplicated watch-progress ledger with a read cache
pub struct ProgressStore<S> {
    storage: S,
    key: String,
    image_base_url: String,
    cache: Mutex<TtlCache<Vec<ProgressRecord>>>,
    /// Serialises load-modify-save sequences within this process
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: STORAGE_KEY.to_string(),
            image_base_url: IMAGE_BASE_URL.to_string(),
            cache: Mutex::new(TtlCache::new(DEFAULT_CACHE_TTL)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = Mutex::new(TtlCache::new(ttl));
        self
    }

    pub fn with_image_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.image_base_url = base_url.into();
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // -------------------------------------------------------------------------
    // Raw persistence
    // -------------------------------------------------------------------------

    /// Replace the persisted ledger with `records`.
    ///
    /// Invalid records are dropped and duplicate keys collapse to the entry
    /// with the greater `last_updated`. Returns whether the write succeeded.
    pub async fn save(&self, records: Vec<ProgressRecord>) -> bool {
        match self.persist(records).await {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, key = %self.key, "Failed to save progress ledger");
                false
            }
        }
    }

    async fn persist(&self, records: Vec<ProgressRecord>) -> Result<Vec<ProgressRecord>, ProgressError> {
        let records = dedupe(records);
        let payload = serde_json::to_string(&records)?;

        // Cache lock spans the write so no reader can cache an older snapshot
        let mut cache = self.cache.lock().await;
        if let Err(e) = self.storage.set(&self.key, &payload).await {
            cache.invalidate();
            return Err(e.into());
        }
        cache.put(records.clone());
        debug!(count = records.len(), "Saved progress ledger");
        Ok(records)
    }

    /// Current ledger, served from cache while fresh.
    ///
    /// Read failures are logged and yield an empty list.
    pub async fn load_raw(&self) -> Vec<ProgressRecord> {
        match self.try_load().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, key = %self.key, "Failed to read progress ledger");
                Vec::new()
            }
        }
    }

    /// Missing and corrupt payloads read as empty; storage failures are
    /// returned so callers never persist on top of a ledger they could not read.
    async fn try_load(&self) -> Result<Vec<ProgressRecord>, ProgressError> {
        let mut cache = self.cache.lock().await;
        if let Some(records) = cache.get() {
            return Ok(records);
        }

        let records = match self.storage.get(&self.key).await? {
            None => Vec::new(),
            Some(raw) => match decode_records(&raw) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, key = %self.key, "Resetting corrupt progress ledger");
                    if let Err(e) = self.storage.set(&self.key, "[]").await {
                        error!(error = %e, "Failed to reset corrupt progress ledger");
                    }
                    Vec::new()
                }
            },
        };

        cache.put(records.clone());
        Ok(records)
    }

    /// Drop the cached ledger so the next read goes to storage
    pub async fn invalidate_cache(&self) {
        self.cache.lock().await.invalidate();
    }

    /// Delete the persisted ledger entirely
    pub async fn clear_all(&self) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut cache = self.cache.lock().await;
        let result = self.storage.remove(&self.key).await;
        cache.invalidate();

        match result {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, key = %self.key, "Failed to clear progress ledger");
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Continue-watching rows, most recently updated first.
    ///
    /// TV rows without a valid last season *and* episode are left out.
    pub async fn load_for_display(&self) -> Vec<DisplayItem> {
        let mut records = self.load_raw().await;
        // sort_by is stable: equal timestamps keep ledger order
        records.sort_by(|a, b| b.last_updated().cmp(&a.last_updated()));

        records
            .iter()
            .filter_map(|record| self.display_item(record))
            .collect()
    }

    fn display_item(&self, record: &ProgressRecord) -> Option<DisplayItem> {
        let (last_season_watched, last_episode_watched) = match record {
            ProgressRecord::Movie(_) => (None, None),
            ProgressRecord::Tv(tv) => {
                let (season, episode) = tv.last_watched()?;
                (Some(season), Some(episode))
            }
        };

        let meta = record.meta();
        Some(DisplayItem {
            id: meta.id,
            media_type: record.media_type(),
            title: meta.title.clone(),
            poster_url: image_url(&self.image_base_url, POSTER_SIZE, meta.poster_path.as_deref()),
            backdrop_url: image_url(
                &self.image_base_url,
                BACKDROP_SIZE,
                meta.backdrop_path.as_deref(),
            ),
            progress_percent: record.current_progress().map(|p| p.percent()).unwrap_or(0),
            last_season_watched,
            last_episode_watched,
            number_of_seasons: meta.number_of_seasons,
            number_of_episodes: meta.number_of_episodes,
            last_updated: meta.last_updated,
        })
    }

    pub async fn get_episode_progress(
        &self,
        id: u64,
        season: u32,
        episode: u32,
    ) -> Option<EpisodeProgress> {
        let records = self.load_raw().await;
        let show = records.iter().find_map(|r| match r {
            ProgressRecord::Tv(tv) if tv.meta.id == id => Some(tv),
            _ => None,
        })?;

        let entry = show.show_progress.get(&episode_key(season, episode))?;
        let progress = entry.progress?;
        Some(EpisodeProgress {
            watched: progress.watched,
            duration: progress.duration,
            progress_percent: progress.percent(),
            last_updated: entry.last_updated,
        })
    }

    pub async fn get_movie_progress(&self, id: u64) -> Option<MovieProgress> {
        let records = self.load_raw().await;
        let progress = records.iter().find_map(|r| match r {
            ProgressRecord::Movie(movie) if movie.meta.id == id => movie.progress,
            _ => None,
        })?;

        Some(MovieProgress {
            watched: progress.watched,
            duration: progress.duration,
            progress_percent: progress.percent(),
        })
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Record the player's position for a title, creating the record if needed.
    ///
    /// `metadata` only seeds new records; existing records keep their
    /// display fields. Returns `false` if nothing was persisted.
    #[instrument(skip(self, playback, metadata))]
    pub async fn update_current_progress(
        &self,
        id: u64,
        media_type: MediaType,
        playback: PlaybackUpdate,
        metadata: &TitleMetadata,
    ) -> bool {
        let _guard = self.write_lock.lock().await;
        let now = now_millis();
        let mut records = match self.try_load().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Not updating progress over an unreadable ledger");
                return false;
            }
        };

        match records.iter_mut().find(|r| r.key() == (media_type, id)) {
            Some(record) => {
                record.meta_mut().last_updated = now;
                apply_playback(record, &playback, now);
            }
            None => {
                let mut record = new_record(id, media_type, metadata, now);
                apply_playback(&mut record, &playback, now);
                if !record.is_valid() {
                    warn!("Refusing to track record without id or title");
                    return false;
                }
                records.insert(0, record);
            }
        }

        self.save(records).await
    }

    /// Remove one title from the ledger.
    ///
    /// `media_type` is taken as a raw string so callers can pass through
    /// untrusted input; anything other than `movie`/`tv` is rejected.
    pub async fn remove_item(&self, id: u64, media_type: &str) -> RemoveOutcome {
        let media_type = match media_type.parse::<MediaType>() {
            Ok(media_type) => media_type,
            Err(reason) => return RemoveOutcome::Failed { reason },
        };
        if id == 0 {
            return RemoveOutcome::Failed {
                reason: "Missing id".to_string(),
            };
        }

        let _guard = self.write_lock.lock().await;
        let mut records = match self.try_load().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, id, "Not removing from an unreadable ledger");
                return RemoveOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };
        let Some(pos) = records.iter().position(|r| r.key() == (media_type, id)) else {
            debug!(id, media_type = media_type.as_str(), "Nothing to remove");
            return RemoveOutcome::NotFound;
        };

        let record = records.remove(pos);
        match self.persist(records).await {
            Ok(saved) => RemoveOutcome::Removed {
                record,
                remaining: saved.len(),
            },
            Err(e) => {
                error!(error = %e, id, "Failed to persist removal");
                RemoveOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Drop invalid records and collapse duplicate keys.
///
/// Survivors keep the position of their key's first occurrence. When two
/// entries share a timestamp the later one wins.
fn dedupe(records: Vec<ProgressRecord>) -> Vec<ProgressRecord> {
    let total = records.len();
    let mut index: HashMap<(MediaType, u64), usize> = HashMap::with_capacity(total);
    let mut out: Vec<ProgressRecord> = Vec::with_capacity(total);
    let mut invalid = 0usize;

    for record in records {
        if !record.is_valid() {
            invalid += 1;
            continue;
        }
        match index.get(&record.key()) {
            Some(&i) => {
                if record.last_updated() >= out[i].last_updated() {
                    out[i] = record;
                }
            }
            None => {
                index.insert(record.key(), out.len());
                out.push(record);
            }
        }
    }

    if invalid > 0 {
        warn!(invalid, total, "Dropped invalid progress records");
    }
    out
}

/// Decode a persisted payload. Non-array payloads are corrupt; individual
/// elements that fail to decode are skipped.
fn decode_records(raw: &str) -> Result<Vec<ProgressRecord>, ProgressError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ProgressError::Corrupt(e.to_string()))?;
    let serde_json::Value::Array(items) = value else {
        return Err(ProgressError::Corrupt("expected a JSON array".to_string()));
    };

    let records = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ProgressRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable progress record");
                None
            }
        })
        .collect();
    Ok(records)
}

fn new_record(id: u64, media_type: MediaType, metadata: &TitleMetadata, now: i64) -> ProgressRecord {
    let meta = RecordMeta::from_metadata(id, metadata, now);
    match media_type {
        MediaType::Movie => ProgressRecord::Movie(MovieRecord {
            meta,
            progress: None,
        }),
        MediaType::Tv => ProgressRecord::Tv(TvRecord {
            meta,
            show_progress: Default::default(),
            last_season_watched: None,
            last_episode_watched: None,
        }),
    }
}

fn apply_playback(record: &mut ProgressRecord, playback: &PlaybackUpdate, now: i64) {
    let progress = WatchProgress {
        watched: playback.current_time,
        duration: playback.duration,
    };

    match record {
        ProgressRecord::Movie(movie) => movie.progress = Some(progress),
        ProgressRecord::Tv(tv) => {
            if let (Some(season), Some(episode)) = (playback.season, playback.episode) {
                tv.last_season_watched = Some(season.to_string());
                tv.last_episode_watched = Some(episode.to_string());
                tv.show_progress.insert(
                    episode_key(season, episode),
                    EpisodeEntry {
                        season,
                        episode,
                        progress: Some(progress),
                        last_updated: now,
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn movie(id: u64, title: &str, last_updated: i64) -> ProgressRecord {
        ProgressRecord::Movie(MovieRecord {
            meta: RecordMeta {
                id,
                title: title.to_string(),
                last_updated,
                ..Default::default()
            },
            progress: None,
        })
    }

    fn tv(id: u64, season: Option<&str>, episode: Option<&str>, last_updated: i64) -> ProgressRecord {
        ProgressRecord::Tv(TvRecord {
            meta: RecordMeta {
                id,
                title: format!("Show {}", id),
                last_updated,
                ..Default::default()
            },
            show_progress: Default::default(),
            last_season_watched: season.map(str::to_string),
            last_episode_watched: episode.map(str::to_string),
        })
    }

    fn store() -> ProgressStore<Arc<MemoryStore>> {
        ProgressStore::new(Arc::new(MemoryStore::new()))
    }

    // -------------------------------------------------------------------------
    // Dedup Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_dedupe_keeps_newest() {
        let out = dedupe(vec![movie(5, "X", 100), movie(5, "X", 200), movie(5, "X", 150)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].last_updated(), 200);
    }

    #[test]
    fn test_dedupe_keys_include_media_type() {
        let out = dedupe(vec![movie(5, "X", 100), tv(5, Some("1"), Some("1"), 50)]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_dedupe_drops_invalid() {
        let out = dedupe(vec![movie(0, "No id", 1), movie(2, "", 1), movie(3, "Ok", 1)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), 3);
    }

    #[test]
    fn test_dedupe_preserves_first_position() {
        let out = dedupe(vec![movie(1, "A", 10), movie(2, "B", 10), movie(1, "A", 30)]);
        assert_eq!(out.iter().map(|r| r.id()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(out[0].last_updated(), 30);
    }

    #[test]
    fn test_dedupe_tie_prefers_later_entry() {
        let out = dedupe(vec![movie(1, "First", 0), movie(1, "Second", 0)]);
        assert_eq!(out[0].meta().title, "Second");
    }

    // -------------------------------------------------------------------------
    // Decode Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(matches!(
            decode_records(r#"{"id":1}"#),
            Err(ProgressError::Corrupt(_))
        ));
        assert!(matches!(decode_records("not json"), Err(ProgressError::Corrupt(_))));
    }

    #[test]
    fn test_decode_skips_bad_elements() {
        let raw = r#"[{"id":1,"type":"movie","title":"A"},{"id":2,"type":"person"},42]"#;
        let records = decode_records(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), 1);
    }

    // -------------------------------------------------------------------------
    // Store Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_load_raw_empty_when_missing() {
        let store = store();
        assert!(store.load_raw().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_raw_resets_corrupt_payload() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(STORAGE_KEY, r#"{"not":"a list"}"#).await.unwrap();
        let store = ProgressStore::new(storage.clone());

        assert!(store.load_raw().await.is_empty());
        assert_eq!(storage.get(STORAGE_KEY).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_cache_serves_until_invalidated() {
        let storage = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(storage.clone());
        assert!(store.save(vec![movie(1, "A", 1)]).await);

        // Out-of-band write is invisible while the cache is fresh
        storage.set(STORAGE_KEY, "[]").await.unwrap();
        assert_eq!(store.load_raw().await.len(), 1);

        store.invalidate_cache().await;
        assert!(store.load_raw().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reads_storage() {
        let storage = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(storage.clone()).with_cache_ttl(Duration::ZERO);
        assert!(store.save(vec![movie(1, "A", 1)]).await);

        storage.set(STORAGE_KEY, "[]").await.unwrap();
        assert!(store.load_raw().await.is_empty());
    }

    #[tokio::test]
    async fn test_custom_key() {
        let storage = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(storage.clone()).with_key("custom");
        assert!(store.save(vec![movie(1, "A", 1)]).await);

        assert!(storage.get("custom").await.unwrap().is_some());
        assert!(storage.get(STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_display_projection() {
        let store = store().with_image_base_url("https://img.test/t/p");
        let mut record = movie(1, "A", 10);
        if let ProgressRecord::Movie(m) = &mut record {
            m.meta.poster_path = Some("/poster.jpg".to_string());
            m.progress = Some(WatchProgress {
                watched: 25.0,
                duration: 100.0,
            });
        }
        assert!(store.save(vec![record]).await);

        let items = store.load_for_display().await;
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].poster_url.as_deref(),
            Some("https://img.test/t/p/w500/poster.jpg")
        );
        assert_eq!(items[0].backdrop_url, None);
        assert_eq!(items[0].progress_percent, 25);
        assert_eq!(items[0].last_season_watched, None);
    }

    #[tokio::test]
    async fn test_remove_rejects_bad_input() {
        let store = store();
        assert!(matches!(
            store.remove_item(1, "person").await,
            RemoveOutcome::Failed { .. }
        ));
        assert!(matches!(
            store.remove_item(0, "movie").await,
            RemoveOutcome::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_update_without_title_is_refused() {
        let store = store();
        let ok = store
            .update_current_progress(
                3,
                MediaType::Movie,
                PlaybackUpdate {
                    current_time: 1.0,
                    duration: 2.0,
                    ..Default::default()
                },
                &TitleMetadata::default(),
            )
            .await;
        assert!(!ok);
        assert!(store.load_raw().await.is_empty());
    }
}
