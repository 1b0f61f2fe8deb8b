//! Tracing subscriber setup.
//!
//! `RUST_LOG` overrides the per-command default filter. The console logs to a
//! file so it does not draw over the terminal UI.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

pub const SERVER_FILTER: &str = "refdesk=info,tower_http=info";
pub const CLI_FILTER: &str = "refdesk=warn";
pub const CONSOLE_FILTER: &str = "refdesk=debug";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to stderr; stdout is left to command output.
pub fn init_stderr(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(default_filter))
        .try_init();
}

/// Log to `path`. Keep the returned guard alive until exit so buffered lines
/// are flushed.
pub fn init_file(path: &Path) -> Result<WorkerGuard, AppError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::new(2, format!("Invalid log file path '{}'.", path.display())))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create log directory '{}': {e}", dir.display())))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(env_filter(CONSOLE_FILTER))
        .try_init();
    Ok(guard)
}
