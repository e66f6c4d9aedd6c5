//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the progress store and stream resolver.
//! Each handler takes CLI args, the loaded config and Output, returns ExitCode.

use std::time::Duration;

use crate::api::TmdbClient;
use crate::cli::{
    validate_episode, ClearCmd, ContinueCmd, ExitCode, Output, ProbeCmd, ProbeResult, ProgressCmd,
    RemoveCmd, ResolveCmd, StatusOk, TrackCmd,
};
use crate::config::Config;
use crate::models::{MediaType, PlaybackUpdate, TitleMetadata};
use crate::progress::RemoveOutcome;

// =============================================================================
// Continue Command
// =============================================================================

pub async fn continue_cmd(cmd: ContinueCmd, config: &Config, output: &Output) -> ExitCode {
    let store = config.progress_store();
    let mut items = store.load_for_display().await;

    if let Some(filter) = cmd.media_type {
        let media_type = MediaType::from(filter);
        items.retain(|item| item.media_type == media_type);
    }
    items.truncate(cmd.limit);

    if items.is_empty() {
        output.info("Nothing in progress");
    }
    if let Err(e) = output.print_lines(&items, items.iter()) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Progress Command
// =============================================================================

pub async fn progress_cmd(cmd: ProgressCmd, config: &Config, output: &Output) -> ExitCode {
    if let Err(e) = validate_episode(cmd.media_type, cmd.season, cmd.episode) {
        return output.error(e, ExitCode::InvalidArgs);
    }
    let store = config.progress_store();

    let printed = match (cmd.season, cmd.episode) {
        (Some(season), Some(episode)) => store
            .get_episode_progress(cmd.id, season, episode)
            .await
            .map(|p| output.print(p)),
        _ => store.get_movie_progress(cmd.id).await.map(|p| output.print(p)),
    };

    match printed {
        Some(Ok(())) => ExitCode::Success,
        Some(Err(e)) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
        None => output.error("No progress stored", ExitCode::NotFound),
    }
}

// =============================================================================
// Track Command
// =============================================================================

pub async fn track_cmd(cmd: TrackCmd, config: &Config, output: &Output) -> ExitCode {
    if let Err(e) = validate_episode(cmd.media_type, cmd.season, cmd.episode) {
        return output.error(e, ExitCode::InvalidArgs);
    }
    if !cmd.time.is_finite() || !cmd.duration.is_finite() || cmd.time < 0.0 {
        return output.error("Invalid --time/--duration", ExitCode::InvalidArgs);
    }

    let media_type = MediaType::from(cmd.media_type);
    let store = config.progress_store();

    let metadata = match cmd.title {
        Some(title) => TitleMetadata {
            title,
            poster_path: cmd.poster,
            backdrop_path: cmd.backdrop,
            ..Default::default()
        },
        None => match lookup_metadata(config, cmd.id, media_type, output).await {
            Some(metadata) => metadata,
            // Existing records don't need metadata; new ones are refused by the store
            None => TitleMetadata::default(),
        },
    };

    let playback = PlaybackUpdate {
        current_time: cmd.time,
        duration: cmd.duration,
        season: cmd.season,
        episode: cmd.episode,
    };

    if !store
        .update_current_progress(cmd.id, media_type, playback, &metadata)
        .await
    {
        return output.error(
            "Progress not saved (new titles need --title or a TMDB key)",
            ExitCode::Error,
        );
    }

    if let Err(e) = output.print(StatusOk::default()) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

async fn lookup_metadata(
    config: &Config,
    id: u64,
    media_type: MediaType,
    output: &Output,
) -> Option<TitleMetadata> {
    let api_key = config.tmdb_api_key()?;
    let client = TmdbClient::new(api_key).with_user_agent(config.user_agent());
    output.info(format!("Fetching metadata for {} {}", media_type.as_str(), id));

    match client.title_metadata(id, media_type).await {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            output.info(format!("Metadata lookup failed: {}", e));
            None
        }
    }
}

// =============================================================================
// Remove / Clear Commands
// =============================================================================

pub async fn remove_cmd(cmd: RemoveCmd, config: &Config, output: &Output) -> ExitCode {
    let store = config.progress_store();
    let outcome = store.remove_item(cmd.id, &cmd.media_type).await;

    if let RemoveOutcome::Failed { reason } = &outcome {
        return output.error(reason.clone(), ExitCode::InvalidArgs);
    }
    if let Err(e) = output.print(&outcome) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

pub async fn clear_cmd(_cmd: ClearCmd, config: &Config, output: &Output) -> ExitCode {
    let store = config.progress_store();
    if !store.clear_all().await {
        return output.error("Failed to clear ledger", ExitCode::Error);
    }
    if let Err(e) = output.print(StatusOk::default()) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Resolve / Probe Commands
// =============================================================================

pub async fn resolve_cmd(cmd: ResolveCmd, config: &Config, output: &Output) -> ExitCode {
    if let Err(e) = validate_episode(cmd.media_type, cmd.season, cmd.episode) {
        return output.error(e, ExitCode::InvalidArgs);
    }
    let request = cmd.request();
    let resolver = config.stream_resolver();

    output.info(format!("Resolving {}", request));
    let Some(resolved) = resolver.resolve(&request).await else {
        return output.error("No provider returned a stream", ExitCode::NoStreams);
    };

    if cmd.check && !resolver.probe(&resolved.url).await {
        return output.error(
            format!("Resolved URL is unreachable: {}", resolved.url),
            ExitCode::Unreachable,
        );
    }

    if let Err(e) = output.print(&resolved) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

pub async fn probe_cmd(cmd: ProbeCmd, config: &Config, output: &Output) -> ExitCode {
    let resolver = config
        .stream_resolver()
        .with_probe_timeout(Duration::from_secs(cmd.timeout));
    let reachable = resolver.probe(&cmd.url).await;

    let result = ProbeResult {
        url: cmd.url,
        reachable,
    };
    if let Err(e) = output.print(&result) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    if reachable {
        ExitCode::Success
    } else {
        ExitCode::Unreachable
    }
}
