//! CLI - Command Line Interface for streamshelf
//!
//! Every operation on the continue-watching ledger and the stream resolver
//! is scriptable. All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Record playback position
//! streamshelf track 1396 -t tv -s 2 -e 3 --time 45 --duration 90 --title "Breaking Bad"
//!
//! # Continue-watching list
//! streamshelf continue --json
//!
//! # Resolve and check a stream
//! streamshelf resolve 550 -t movie
//! streamshelf probe https://cdn.example/master.m3u8
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::{MediaType, StreamRequest};

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// No progress stored for the title
    NotFound = 4,
    /// No provider produced a stream
    NoStreams = 5,
    /// Probe target unreachable
    Unreachable = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// streamshelf - continue-watching ledger and stream resolver
#[derive(Parser, Debug)]
#[command(
    name = "streamshelf",
    version,
    author = "Gorka & Hermes",
    about = "Continue-watching ledger and embed stream resolver",
    after_help = "EXAMPLES:\n\
                  streamshelf continue                         List titles in progress\n\
                  streamshelf track 550 -t movie --time 600 --duration 8340 --title \"Fight Club\"\n\
                  streamshelf resolve 1396 -t tv -s 1 -e 1     Find a playable URL"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List titles in progress, most recent first
    #[command(visible_alias = "ls")]
    Continue(ContinueCmd),

    /// Show stored progress for a movie or episode
    #[command(visible_alias = "p")]
    Progress(ProgressCmd),

    /// Record the current playback position
    #[command(visible_alias = "t")]
    Track(TrackCmd),

    /// Remove a title from the ledger
    #[command(visible_alias = "rm")]
    Remove(RemoveCmd),

    /// Delete the whole ledger
    Clear(ClearCmd),

    /// Resolve a title to a playable stream URL
    #[command(visible_alias = "r")]
    Resolve(ResolveCmd),

    /// Check whether a stream URL is reachable
    Probe(ProbeCmd),
}

/// Media type argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTypeArg {
    /// Movie
    Movie,
    /// TV show
    Tv,
}

impl From<MediaTypeArg> for MediaType {
    fn from(arg: MediaTypeArg) -> Self {
        match arg {
            MediaTypeArg::Movie => MediaType::Movie,
            MediaTypeArg::Tv => MediaType::Tv,
        }
    }
}

// =============================================================================
// Ledger Commands
// =============================================================================

#[derive(Args, Debug)]
pub struct ContinueCmd {
    /// Maximum number of rows
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,

    /// Only show one media type
    #[arg(long, short = 't', value_enum)]
    pub media_type: Option<MediaTypeArg>,
}

#[derive(Args, Debug)]
pub struct ProgressCmd {
    /// TMDB ID
    #[arg(required = true)]
    pub id: u64,

    #[arg(long, short = 't', value_enum)]
    pub media_type: MediaTypeArg,

    /// Season number (tv)
    #[arg(long, short = 's')]
    pub season: Option<u32>,

    /// Episode number (tv)
    #[arg(long, short = 'e')]
    pub episode: Option<u32>,
}

#[derive(Args, Debug)]
pub struct TrackCmd {
    /// TMDB ID
    #[arg(required = true)]
    pub id: u64,

    #[arg(long, short = 't', value_enum)]
    pub media_type: MediaTypeArg,

    /// Current playback position in seconds
    #[arg(long)]
    pub time: f64,

    /// Total duration in seconds
    #[arg(long)]
    pub duration: f64,

    /// Season number (tv)
    #[arg(long, short = 's')]
    pub season: Option<u32>,

    /// Episode number (tv)
    #[arg(long, short = 'e')]
    pub episode: Option<u32>,

    /// Title for new records (fetched from TMDB when omitted)
    #[arg(long)]
    pub title: Option<String>,

    /// Poster path, e.g. /abc.jpg
    #[arg(long)]
    pub poster: Option<String>,

    /// Backdrop path
    #[arg(long)]
    pub backdrop: Option<String>,
}

#[derive(Args, Debug)]
pub struct RemoveCmd {
    /// TMDB ID
    #[arg(required = true)]
    pub id: u64,

    /// Media type (movie or tv)
    #[arg(long, short = 't')]
    pub media_type: String,
}

#[derive(Args, Debug)]
pub struct ClearCmd {}

// =============================================================================
// Stream Commands
// =============================================================================

#[derive(Args, Debug)]
pub struct ResolveCmd {
    /// TMDB ID
    #[arg(required = true)]
    pub id: u64,

    #[arg(long, short = 't', value_enum)]
    pub media_type: MediaTypeArg,

    /// Season number (tv)
    #[arg(long, short = 's')]
    pub season: Option<u32>,

    /// Episode number (tv)
    #[arg(long, short = 'e')]
    pub episode: Option<u32>,

    /// Also probe the resolved URL
    #[arg(long)]
    pub check: bool,
}

impl ResolveCmd {
    pub fn request(&self) -> StreamRequest {
        StreamRequest {
            id: self.id,
            media_type: self.media_type.into(),
            season: self.season,
            episode: self.episode,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProbeCmd {
    /// URL to check
    #[arg(required = true)]
    pub url: String,

    /// Timeout in seconds
    #[arg(long, short = 't', default_value = "5")]
    pub timeout: u64,
}

/// Season/episode must be given together for tv, and never for movies
pub fn validate_episode(
    media_type: MediaTypeArg,
    season: Option<u32>,
    episode: Option<u32>,
) -> Result<(), &'static str> {
    match (media_type, season, episode) {
        (MediaTypeArg::Movie, None, None) => Ok(()),
        (MediaTypeArg::Movie, _, _) => Err("Season/episode are only valid for tv"),
        (MediaTypeArg::Tv, Some(s), Some(e)) if s > 0 && e > 0 => Ok(()),
        (MediaTypeArg::Tv, _, _) => Err("TV requires positive --season and --episode"),
    }
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Status OK response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusOk {
    pub status: &'static str,
}

impl Default for StatusOk {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

/// Probe response
#[derive(Debug, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    pub reachable: bool,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            // For non-JSON, caller should handle formatting
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print human-readable lines, or the JSON form of `data`
    pub fn print_lines<T: Serialize, D: std::fmt::Display>(
        &self,
        data: &[T],
        lines: impl IntoIterator<Item = D>,
    ) -> anyhow::Result<()> {
        if self.json {
            return self.print(data);
        }
        for line in lines {
            println!("{}", line);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
