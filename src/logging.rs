//! File logging via `tracing`.
//!
//! The terminal belongs to the UI, so events only ever go to a file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::AppConfig;
use crate::error::{AppError, Result};

/// Environment variable overriding the configured filter.
pub const LOG_ENV: &str = "DOCWS_LOG";

/// Resolve the log file: configured path, else `<data_dir>/docws/docws.log`.
pub fn resolve_log_file_path(config_file: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = config_file.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(p.to_path_buf());
    }
    let data_dir = dirs::data_dir().ok_or_else(|| {
        AppError::Config("could not determine data directory for log file".to_string())
    })?;
    Ok(data_dir.join("docws").join("docws.log"))
}

/// Filter from `$DOCWS_LOG`, then `$RUST_LOG`, then the configured level.
fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| AppError::Config(format!("invalid log level {:?}: {}", level, e)))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?)
}

/// Install the global subscriber. Returns the log file in use, or `None`
/// when logging is disabled.
pub fn init_logging(config: &AppConfig) -> Result<Option<PathBuf>> {
    if !config.logging_enabled() {
        return Ok(None);
    }

    let filter = build_env_filter(config.log_level())?;
    let path = resolve_log_file_path(config.logging.file.as_deref())?;
    let file = open_log_file(&path)?;

    Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| AppError::Config(format!("logging already initialized: {}", e)))?;

    tracing::info!(path = %path.display(), "logging initialized");
    Ok(Some(path))
}
