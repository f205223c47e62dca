//! provides logging helpers

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// Environment variable holding an optional log file path.
pub const LOG_PATH_ENV_VAR: &str = "DAEMON_ACCOUNTING_LOG_PATH";

/// Number of rotated log files kept on disk.
const MAX_LOG_FILES: usize = 3;

fn env_filter() -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Build a daily rolling, non-blocking writer for `log_path`.
///
/// The returned guard must be held for as long as log lines should be flushed.
pub fn rolling_writer(
    log_path: &Path,
) -> anyhow::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = log_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid log file path: {}", log_path.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("failed to create rolling file appender in {}", dir.display()))?;

    Ok(tracing_appender::non_blocking(appender))
}

/// initiate the global tracing subscriber
///
/// Logs always go to stderr. When `log_path` is set, the same events are also
/// written to a daily rolling file without ANSI colors.
pub fn init<P: AsRef<Path>>(log_path: Option<P>) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter());

    match log_path {
        Some(log_path) => {
            let (file_writer, guard) = rolling_writer(log_path.as_ref())?;
            let file_layer = layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter());

            registry().with(stderr_layer).with(file_layer).init();
            Ok(Some(guard))
        }
        None => {
            registry().with(stderr_layer).init();
            Ok(None)
        }
    }
}
