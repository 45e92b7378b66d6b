// src/logging.rs

//! Logging setup for `assetforge` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `ASSETFORGE_LOG`: a level ("info", "debug") or full `EnvFilter`
//!    directives ("warn,assetforge::watch=debug")
//! 3. default to `info`
//!
//! A plain level applies to assetforge itself. Stylesheet `@debug`/`@warn`
//! output (target [`SASS_TARGET`]) is shown down to `debug` at any level, and
//! the watcher and glob crates stay at `warn` unless tracing.
//!
//! Logs go to STDERR; stdout only carries compile notifications, the
//! watch banner and dry-run output.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Target of messages raised by stylesheets through `@debug` and `@warn`.
pub const SASS_TARGET: &str = "assetforge::sass";

/// Crates whose chatter is capped at `warn` below `trace`.
const QUIET_DEPENDENCIES: &[&str] = &["notify", "globset"];

/// Initialise global logging subscriber.
///
/// Only the binary calls this. Library code emits events and leaves the
/// subscriber to its host.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let directives = match cli_level {
        Some(lvl) => directives_for(level_from_log_level(lvl)),
        None => directives_from_env(std::env::var("ASSETFORGE_LOG").ok().as_deref()),
    };
    let filter = EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("invalid ASSETFORGE_LOG {directives:?}: {e}"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

fn directives_from_env(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") => directives_for(Level::INFO),
        Some(raw) => match parse_level_str(raw) {
            Some(level) => directives_for(level),
            None => raw.to_string(),
        },
    }
}

fn directives_for(level: Level) -> String {
    let name = |l: Level| l.as_str().to_ascii_lowercase();
    let mut out = vec![
        name(level.min(Level::WARN)),
        format!("assetforge={}", name(level)),
        format!("{SASS_TARGET}={}", name(level.max(Level::DEBUG))),
    ];
    if level < Level::TRACE {
        out.extend(
            QUIET_DEPENDENCIES
                .iter()
                .map(|krate| format!("{krate}={}", name(level.min(Level::WARN)))),
        );
    } else {
        out[0] = name(level);
    }
    out.join(",")
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
