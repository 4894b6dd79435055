//! Logging setup: stderr plus a daily-rolling file under `~/.trigger-sensor/logs`.

use std::env;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::APP_DIR;

const DEBUG_ENV: &str = "TRIGGER_SENSOR_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "trigger-daemon.log";

/// The returned guard must live until exit or buffered file output is lost.
pub fn init() -> Option<WorkerGuard> {
    let filter = build_filter();

    let log_dir = match log_dir() {
        Some(dir) if fs_err::create_dir_all(&dir).is_ok() => dir,
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            tracing::warn!("Log directory unavailable; logging to stderr only");
            return None;
        }
    };

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(path = %log_dir.display(), "Logging initialized");
    Some(guard)
}

fn build_filter() -> EnvFilter {
    let debug_enabled = env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

pub fn log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR).join("logs"))
}
