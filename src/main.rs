//! streamshelf - continue-watching ledger and embed stream resolver
//!
//! # Usage
//!
//! ```bash
//! streamshelf continue
//! streamshelf track 550 -t movie --time 600 --duration 8340 --title "Fight Club"
//! streamshelf resolve 1396 -t tv -s 1 -e 1 --json
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

use streamshelf::cli::{Cli, Command, ExitCode, Output};
use streamshelf::commands;
use streamshelf::config::Config;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    let cli = Cli::parse();
    run_cli(cli).await.into()
}

/// Log to stderr so JSON on stdout stays parseable.
/// Filter from STREAMSHELF_LOG, then RUST_LOG, default `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("STREAMSHELF_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    match cli.command {
        Command::Continue(cmd) => commands::continue_cmd(cmd, &config, &output).await,
        Command::Progress(cmd) => commands::progress_cmd(cmd, &config, &output).await,
        Command::Track(cmd) => commands::track_cmd(cmd, &config, &output).await,
        Command::Remove(cmd) => commands::remove_cmd(cmd, &config, &output).await,
        Command::Clear(cmd) => commands::clear_cmd(cmd, &config, &output).await,
        Command::Resolve(cmd) => commands::resolve_cmd(cmd, &config, &output).await,
        Command::Probe(cmd) => commands::probe_cmd(cmd, &config, &output).await,
    }
}
