//! CLI Command Tests
//!
//! Tests argument parsing, JSON output format, exit codes and the ledger
//! commands run against a temporary data directory.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use streamshelf::cli::{Cli, Command, ExitCode as CliExitCode, MediaTypeArg};
    use streamshelf::models::{MediaType, StreamRequest};

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["streamshelf"]).is_err());
    }

    #[test]
    fn test_continue_command_defaults() {
        let cli = Cli::parse_from(["streamshelf", "continue"]);
        match cli.command {
            Command::Continue(cmd) => {
                assert_eq!(cmd.limit, 20); // default
                assert!(cmd.media_type.is_none());
            }
            _ => panic!("Expected Continue command"),
        }
    }

    #[test]
    fn test_continue_with_filters() {
        let cli = Cli::parse_from(["streamshelf", "continue", "--limit", "5", "-t", "tv"]);
        match cli.command {
            Command::Continue(cmd) => {
                assert_eq!(cmd.limit, 5);
                assert_eq!(cmd.media_type, Some(MediaTypeArg::Tv));
            }
            _ => panic!("Expected Continue command"),
        }
    }

    #[test]
    fn test_progress_command_episode() {
        let cli = Cli::parse_from(["streamshelf", "progress", "1396", "-t", "tv", "-s", "2", "-e", "5"]);
        match cli.command {
            Command::Progress(cmd) => {
                assert_eq!(cmd.id, 1396);
                assert_eq!(cmd.media_type, MediaTypeArg::Tv);
                assert_eq!(cmd.season, Some(2));
                assert_eq!(cmd.episode, Some(5));
            }
            _ => panic!("Expected Progress command"),
        }
    }

    #[test]
    fn test_track_command() {
        let cli = Cli::parse_from([
            "streamshelf",
            "track",
            "550",
            "-t",
            "movie",
            "--time",
            "600.5",
            "--duration",
            "8340",
            "--title",
            "Fight Club",
            "--poster",
            "/fc.jpg",
        ]);
        match cli.command {
            Command::Track(cmd) => {
                assert_eq!(cmd.id, 550);
                assert_eq!(cmd.media_type, MediaTypeArg::Movie);
                assert_eq!(cmd.time, 600.5);
                assert_eq!(cmd.duration, 8340.0);
                assert_eq!(cmd.title.as_deref(), Some("Fight Club"));
                assert_eq!(cmd.poster.as_deref(), Some("/fc.jpg"));
                assert!(cmd.backdrop.is_none());
                assert!(cmd.season.is_none());
            }
            _ => panic!("Expected Track command"),
        }
    }

    #[test]
    fn test_track_requires_time_and_duration() {
        assert!(Cli::try_parse_from(["streamshelf", "track", "550", "-t", "movie"]).is_err());
        assert!(
            Cli::try_parse_from(["streamshelf", "track", "550", "-t", "movie", "--time", "1"])
                .is_err()
        );
    }

    #[test]
    fn test_remove_takes_raw_media_type() {
        // Validation happens in the store so unknown types reach it
        let cli = Cli::parse_from(["streamshelf", "remove", "42", "-t", "anime"]);
        match cli.command {
            Command::Remove(cmd) => {
                assert_eq!(cmd.id, 42);
                assert_eq!(cmd.media_type, "anime");
            }
            _ => panic!("Expected Remove command"),
        }
    }

    #[test]
    fn test_resolve_command_builds_request() {
        let cli = Cli::parse_from([
            "streamshelf", "resolve", "1396", "-t", "tv", "-s", "1", "-e", "2", "--check",
        ]);
        match cli.command {
            Command::Resolve(cmd) => {
                assert!(cmd.check);
                assert_eq!(cmd.request(), StreamRequest::episode(1396, 1, 2));
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_resolve_movie_request() {
        let cli = Cli::parse_from(["streamshelf", "resolve", "550", "-t", "movie"]);
        match cli.command {
            Command::Resolve(cmd) => {
                assert!(!cmd.check);
                let request = cmd.request();
                assert_eq!(request.media_type, MediaType::Movie);
                assert_eq!(request, StreamRequest::movie(550));
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_probe_command() {
        let cli = Cli::parse_from(["streamshelf", "probe", "https://cdn.test/a.m3u8"]);
        match cli.command {
            Command::Probe(cmd) => {
                assert_eq!(cmd.url, "https://cdn.test/a.m3u8");
                assert_eq!(cmd.timeout, 5);
            }
            _ => panic!("Expected Probe command"),
        }

        let cli = Cli::parse_from(["streamshelf", "probe", "https://cdn.test/a.m3u8", "-t", "2"]);
        match cli.command {
            Command::Probe(cmd) => assert_eq!(cmd.timeout, 2),
            _ => panic!("Expected Probe command"),
        }
    }

    #[test]
    fn test_invalid_media_type_rejected() {
        assert!(Cli::try_parse_from(["streamshelf", "resolve", "1", "-t", "anime"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "streamshelf",
            "--json",
            "--quiet",
            "--config",
            "/path/to/config.toml",
            "clear",
        ]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert_eq!(
            cli.config,
            Some(std::path::PathBuf::from("/path/to/config.toml"))
        );
        assert!(matches!(cli.command, Command::Clear(_)));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["streamshelf", "continue", "-j", "-q"]);
        assert!(cli.json);
        assert!(cli.quiet);
    }

    #[test]
    fn test_command_aliases() {
        let cli = Cli::parse_from(["streamshelf", "ls"]);
        assert!(matches!(cli.command, Command::Continue(_)));

        let cli = Cli::parse_from(["streamshelf", "p", "550", "-t", "movie"]);
        assert!(matches!(cli.command, Command::Progress(_)));

        let cli = Cli::parse_from([
            "streamshelf", "t", "550", "-t", "movie", "--time", "1", "--duration", "2",
        ]);
        assert!(matches!(cli.command, Command::Track(_)));

        let cli = Cli::parse_from(["streamshelf", "rm", "550", "-t", "movie"]);
        assert!(matches!(cli.command, Command::Remove(_)));

        let cli = Cli::parse_from(["streamshelf", "r", "550", "-t", "movie"]);
        assert!(matches!(cli.command, Command::Resolve(_)));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(CliExitCode::Success), 0);
        assert_eq!(i32::from(CliExitCode::Error), 1);
        assert_eq!(i32::from(CliExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(CliExitCode::NetworkError), 3);
        assert_eq!(i32::from(CliExitCode::NotFound), 4);
        assert_eq!(i32::from(CliExitCode::NoStreams), 5);
        assert_eq!(i32::from(CliExitCode::Unreachable), 6);
    }
}

// =============================================================================
// Episode Validation Tests
// =============================================================================

mod episode_validation {
    use streamshelf::cli::{validate_episode, MediaTypeArg};

    #[test]
    fn test_movie_rejects_episode_fields() {
        assert!(validate_episode(MediaTypeArg::Movie, None, None).is_ok());
        assert!(validate_episode(MediaTypeArg::Movie, Some(1), Some(1)).is_err());
        assert!(validate_episode(MediaTypeArg::Movie, None, Some(1)).is_err());
    }

    #[test]
    fn test_tv_requires_both_positive() {
        assert!(validate_episode(MediaTypeArg::Tv, Some(1), Some(1)).is_ok());
        assert!(validate_episode(MediaTypeArg::Tv, None, None).is_err());
        assert!(validate_episode(MediaTypeArg::Tv, Some(3), None).is_err());
        assert!(validate_episode(MediaTypeArg::Tv, Some(1), Some(0)).is_err());
    }
}

// =============================================================================
// JSON Output Format Tests
// =============================================================================

mod json_output {
    use streamshelf::cli::{ExitCode, JsonOutput, ProbeResult, StatusOk};
    use streamshelf::models::ResolvedStream;

    #[test]
    fn test_json_output_success() {
        let output = JsonOutput::success("test data");
        let json = serde_json::to_string(&output).unwrap();

        assert!(json.contains("\"data\":\"test data\""));
        assert!(!json.contains("error"));
        assert!(!json.contains("exit_code")); // Should be omitted when 0
    }

    #[test]
    fn test_json_output_error() {
        let output = JsonOutput::<()>::error_msg("Something went wrong", ExitCode::NetworkError);
        let json = serde_json::to_string(&output).unwrap();

        assert!(json.contains("\"error\":\"Something went wrong\""));
        assert!(json.contains("\"exit_code\":3"));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn test_status_ok_format() {
        let json = serde_json::to_string(&StatusOk::default()).unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }

    #[test]
    fn test_probe_result_format() {
        let result = ProbeResult {
            url: "https://cdn.test/a.m3u8".into(),
            reachable: false,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"url":"https://cdn.test/a.m3u8","reachable":false}"#);
    }

    #[test]
    fn test_resolved_stream_in_envelope() {
        let resolved = ResolvedStream {
            url: "https://cdn.test/a.m3u8".into(),
            provider: "B".into(),
        };
        let value = serde_json::to_value(JsonOutput::success(&resolved)).unwrap();
        assert_eq!(value["data"]["url"], "https://cdn.test/a.m3u8");
        assert_eq!(value["data"]["provider"], "B");
    }
}

// =============================================================================
// Output Helper Tests
// =============================================================================

mod output_helpers {
    use clap::Parser;
    use streamshelf::cli::{Cli, ExitCode, Output};

    #[test]
    fn test_output_json_mode() {
        let cli = Cli::parse_from(["streamshelf", "--json", "continue"]);
        let output = Output::new(&cli);
        assert!(output.json);
    }

    #[test]
    fn test_output_quiet_mode() {
        let cli = Cli::parse_from(["streamshelf", "--quiet", "continue"]);
        let output = Output::new(&cli);
        assert!(output.quiet);
    }

    #[test]
    fn test_error_returns_code() {
        let output = Output {
            json: true,
            quiet: true,
        };
        assert_eq!(output.error("nope", ExitCode::NoStreams), ExitCode::NoStreams);
    }
}

// =============================================================================
// Ledger Command Tests
// =============================================================================

mod ledger_commands {
    use clap::Parser;
    use streamshelf::cli::{Cli, Command, ExitCode, Output};
    use streamshelf::commands;
    use streamshelf::config::Config;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Config, Output) {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let output = Output {
            json: true,
            quiet: true,
        };
        (dir, config, output)
    }

    async fn run(args: &[&str], config: &Config, output: &Output) -> ExitCode {
        let cli = Cli::parse_from(args);
        match cli.command {
            Command::Continue(cmd) => commands::continue_cmd(cmd, config, output).await,
            Command::Progress(cmd) => commands::progress_cmd(cmd, config, output).await,
            Command::Track(cmd) => commands::track_cmd(cmd, config, output).await,
            Command::Remove(cmd) => commands::remove_cmd(cmd, config, output).await,
            Command::Clear(cmd) => commands::clear_cmd(cmd, config, output).await,
            Command::Resolve(cmd) => commands::resolve_cmd(cmd, config, output).await,
            Command::Probe(cmd) => commands::probe_cmd(cmd, config, output).await,
        }
    }

    #[tokio::test]
    async fn test_track_then_progress() {
        let (_dir, config, output) = setup();

        let code = run(
            &[
                "streamshelf", "track", "1396", "-t", "tv", "-s", "1", "-e", "2", "--time", "300",
                "--duration", "600", "--title", "Breaking Bad",
            ],
            &config,
            &output,
        )
        .await;
        assert_eq!(code, ExitCode::Success);

        let store = config.progress_store();
        let progress = store.get_episode_progress(1396, 1, 2).await.unwrap();
        assert_eq!(progress.watched, 300.0);
        assert_eq!(progress.duration, 600.0);

        let code = run(
            &["streamshelf", "progress", "1396", "-t", "tv", "-s", "1", "-e", "2"],
            &config,
            &output,
        )
        .await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_progress_not_found() {
        let (_dir, config, output) = setup();
        let code = run(&["streamshelf", "progress", "550", "-t", "movie"], &config, &output).await;
        assert_eq!(code, ExitCode::NotFound);
    }

    #[tokio::test]
    async fn test_track_rejects_bad_episode_args() {
        let (_dir, config, output) = setup();
        let code = run(
            &["streamshelf", "track", "1396", "-t", "tv", "--time", "1", "--duration", "2"],
            &config,
            &output,
        )
        .await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_remove_unknown_type_is_invalid() {
        let (_dir, config, output) = setup();
        let code = run(&["streamshelf", "remove", "1", "-t", "anime"], &config, &output).await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (_dir, config, output) = setup();

        for id in ["550", "680"] {
            let code = run(
                &[
                    "streamshelf", "track", id, "-t", "movie", "--time", "10", "--duration",
                    "100", "--title", "Film",
                ],
                &config,
                &output,
            )
            .await;
            assert_eq!(code, ExitCode::Success);
        }

        let code = run(&["streamshelf", "remove", "550", "-t", "movie"], &config, &output).await;
        assert_eq!(code, ExitCode::Success);
        // Removing again reports not found but still succeeds
        let code = run(&["streamshelf", "remove", "550", "-t", "movie"], &config, &output).await;
        assert_eq!(code, ExitCode::Success);
        assert_eq!(config.progress_store().load_raw().await.len(), 1);

        let code = run(&["streamshelf", "clear"], &config, &output).await;
        assert_eq!(code, ExitCode::Success);
        assert!(config.progress_store().load_raw().await.is_empty());
    }

    #[tokio::test]
    async fn test_continue_on_empty_ledger() {
        let (_dir, config, output) = setup();
        let code = run(&["streamshelf", "continue"], &config, &output).await;
        assert_eq!(code, ExitCode::Success);
    }
}
