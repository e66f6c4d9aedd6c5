//! streamshelf - continue-watching ledger and embed stream resolver
//!
//! Two independent pieces sit behind a TMDB-driven catalog app:
//! a locally persisted watch-progress ledger, and a resolver that turns a
//! title into a directly playable URL via a chain of embed providers.
//!
//! # Modules
//!
//! - `models` - Records, display rows, stream requests
//! - `storage` - Key-value persistence (file and in-memory)
//! - `progress` - Deduplicated progress ledger with a read cache
//! - `resolver` - Provider chain and reachability probe
//! - `api` - TMDB metadata client and image URLs
//! - `config` - Config file and component wiring
//! - `cli` / `commands` - Command line surface

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod progress;
pub mod resolver;
pub mod storage;

// Re-export commonly used types
pub use models::{
    DisplayItem, EpisodeProgress, MediaType, MovieProgress, PlaybackUpdate, ProgressRecord,
    ResolvedStream, StreamRequest, TitleMetadata,
};

pub use api::TmdbClient;
pub use config::Config;
pub use progress::{ProgressStore, RemoveOutcome};
pub use resolver::{StreamProvider, StreamResolver};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
