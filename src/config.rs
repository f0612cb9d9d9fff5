//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--base-url`, `--log-level`, `--no-autosave`)
//! 2. Explicit `--config` file
//! 3. `$DOCWS_CONFIG` environment variable (path to config file)
//! 4. Project-local `.docws.toml` in the current working directory
//! 5. Global `~/.config/docws/config.toml`
//! 6. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::remote::generate::DEFAULT_AI_BASE_URL;
use crate::remote::http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

// ── Section configs ──────────────────────────────────────────────────────────

/// Workspace server settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// API base URL, e.g. `http://localhost:8000/api`.
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Credential settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// File holding the session token.
    pub token_file: Option<PathBuf>,
}

/// Text generation settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: Option<String>,
    pub enabled: Option<bool>,
    /// Model to start with when the server offers it.
    pub model: Option<String>,
}

/// Document editor settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EditorConfig {
    /// Seconds between autosaves of a dirty document; 0 disables autosave.
    pub autosave_secs: Option<u64>,
}

/// Tree panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Use nerd font icons (false = ASCII fallback).
    pub use_icons: Option<bool>,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: Option<bool>,
    /// Filter directive, e.g. `info` or `docws=debug`.
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub ai: AiConfig,
    pub editor: EditorConfig,
    pub tree: TreeConfig,
    pub logging: LoggingConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default autosave interval in seconds.
pub const DEFAULT_AUTOSAVE_SECS: u64 = 5;
/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "DOCWS_CONFIG";

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".docws.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("docws").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`: `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                base_url: other.server.base_url.clone().or(self.server.base_url),
                timeout_secs: other.server.timeout_secs.or(self.server.timeout_secs),
            },
            auth: AuthConfig {
                token_file: other.auth.token_file.clone().or(self.auth.token_file),
            },
            ai: AiConfig {
                base_url: other.ai.base_url.clone().or(self.ai.base_url),
                enabled: other.ai.enabled.or(self.ai.enabled),
                model: other.ai.model.clone().or(self.ai.model),
            },
            editor: EditorConfig {
                autosave_secs: other.editor.autosave_secs.or(self.editor.autosave_secs),
            },
            tree: TreeConfig {
                use_icons: other.tree.use_icons.or(self.tree.use_icons),
            },
            logging: LoggingConfig {
                enabled: other.logging.enabled.or(self.logging.enabled),
                level: other.logging.level.clone().or(self.logging.level),
                file: other.logging.file.clone().or(self.logging.file),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so higher-priority files overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn base_url(&self) -> &str {
        self.server.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Token file, falling back to `<config_dir>/docws/token`.
    pub fn token_file(&self) -> Option<PathBuf> {
        self.auth
            .token_file
            .clone()
            .or_else(crate::remote::credentials::default_token_file)
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.enabled.unwrap_or(true)
    }

    pub fn ai_base_url(&self) -> &str {
        self.ai.base_url.as_deref().unwrap_or(DEFAULT_AI_BASE_URL)
    }

    pub fn preferred_model(&self) -> Option<&str> {
        self.ai.model.as_deref()
    }

    /// Autosave interval; `None` when autosave is disabled.
    pub fn autosave_interval(&self) -> Option<Duration> {
        match self.editor.autosave_secs.unwrap_or(DEFAULT_AUTOSAVE_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Whether to use nerd font icons.
    pub fn use_icons(&self) -> bool {
        self.tree.use_icons.unwrap_or(true)
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging.enabled.unwrap_or(true)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
