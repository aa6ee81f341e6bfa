use opqueue::cli::{CliArgs, LogLevel};
use opqueue::logging::resolve_level;

use clap::Parser;
use tracing::Level;

#[test]
fn cli_flag_beats_environment() {
    assert_eq!(resolve_level(Some(LogLevel::Debug), Some("error")), Level::DEBUG);
    assert_eq!(resolve_level(Some(LogLevel::Trace), None), Level::TRACE);
}

#[test]
fn environment_is_used_when_flag_missing() {
    assert_eq!(resolve_level(None, Some("warn")), Level::WARN);
    assert_eq!(resolve_level(None, Some(" WARNING ")), Level::WARN);
    assert_eq!(resolve_level(None, Some("trace")), Level::TRACE);
}

#[test]
fn unknown_or_missing_level_falls_back_to_info() {
    assert_eq!(resolve_level(None, Some("loud")), Level::INFO);
    assert_eq!(resolve_level(None, None), Level::INFO);
}

#[test]
fn cli_defaults_and_overrides_parse() {
    let args = CliArgs::parse_from(["opqueue"]);
    assert_eq!(args.config, "Opqueue.toml");
    assert_eq!(args.workers, None);
    assert_eq!(args.log_level, None);
    assert!(!args.dry_run);

    let args = CliArgs::parse_from([
        "opqueue",
        "--config",
        "plans/demo.toml",
        "--workers",
        "3",
        "--log-level",
        "debug",
        "--dry-run",
    ]);
    assert_eq!(args.config, "plans/demo.toml");
    assert_eq!(args.workers, Some(3));
    assert_eq!(args.log_level, Some(LogLevel::Debug));
    assert!(args.dry_run);
}
