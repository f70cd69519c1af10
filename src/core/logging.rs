//! Process-wide tracing setup: a daily rolling file under the log directory,
//! plus an optional console layer on stderr. Stdout is left to the command
//! output (ingest report, chat transcript).

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

const LOG_FILE_PREFIX: &str = "assistant.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stderr,
    /// File only; for interactive commands that own the terminal.
    Off,
}

/// Installs the subscriber. Only the first call in a process takes effect.
pub fn init(paths: &AppPaths, console: Console) {
    let log_dir = &paths.log_dir;
    if let Err(err) = std::fs::create_dir_all(log_dir) {
        eprintln!("Cannot create log directory {}: {}", log_dir.display(), err);
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = (console == Console::Stderr).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(file_writer);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
