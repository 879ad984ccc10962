//! Tracing configuration and log routing.
//!
//! The server logs to stdout with a compact formatter and appends to a file: `DOCSUM_LOG_FILE`
//! when set, `logs/docsum.log` otherwise. The CLI keeps stdout free for summaries and logs to
//! stderr only.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Compact stdout plus a non-blocking file writer (server mode).
    StdoutAndFile,
    /// Stderr only, for command-line use where stdout carries results.
    Stderr,
}

/// Install the global tracing subscriber.
///
/// Respects `RUST_LOG` for filtering and defaults to `info` (`warn` for the CLI).
pub fn init_tracing(output: LogOutput) {
    let default_level = match output {
        LogOutput::StdoutAndFile => "info",
        LogOutput::Stderr => "warn",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .compact(),
                )
                .init();
        }
        LogOutput::StdoutAndFile => {
            let registry = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).compact());

            if let Some(writer) = configure_file_writer() {
                let file_layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
                    .compact();
                registry.with(file_layer).init();
            } else {
                registry.init();
            }
        }
    }
}

/// Returns `None` when the log file cannot be opened; stdout logging still works.
fn configure_file_writer() -> Option<NonBlocking> {
    let (non_blocking, guard) = match std::env::var("DOCSUM_LOG_FILE") {
        Ok(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| eprintln!("Failed to open log file {path}: {err}"))
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        Err(_) => {
            if let Err(err) = std::fs::create_dir_all("logs") {
                eprintln!("Failed to create logs directory: {err}");
                return None;
            }
            tracing_appender::non_blocking(tracing_appender::rolling::never("logs", "docsum.log"))
        }
    };
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
