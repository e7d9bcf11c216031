//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`LCA_BACKEND_URL`, `LCA_CREDENTIAL_PATH`, `LCA_CONFIG`)
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing TOML file is not an error: the client warns and starts on defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding `backend_url`
pub const ENV_BACKEND_URL: &str = "LCA_BACKEND_URL";
/// Environment variable overriding `credential_path`
pub const ENV_CREDENTIAL_PATH: &str = "LCA_CREDENTIAL_PATH";
/// Environment variable pointing at an alternate TOML file
pub const ENV_CONFIG_PATH: &str = "LCA_CONFIG";

const APP_DIR: &str = "lca";

/// Configuration as written in `config.toml`
///
/// Every key is optional; absent keys take the compiled defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Base URL of the analysis backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Upper bound for a single upload request, in seconds
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,

    /// Period of the notification poll loop, in milliseconds
    #[serde(default = "default_notification_poll_interval_ms")]
    pub notification_poll_interval_ms: u64,

    /// Optional `n` query parameter for `/notifications/latest`
    #[serde(default)]
    pub notification_limit: Option<u32>,

    /// Period of the out-of-band session check, in milliseconds
    #[serde(default = "default_session_check_interval_ms")]
    pub session_check_interval_ms: u64,

    /// File holding the stored credential
    #[serde(default)]
    pub credential_path: Option<PathBuf>,

    /// Directory amended contracts are downloaded into
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            upload_timeout_secs: default_upload_timeout_secs(),
            notification_poll_interval_ms: default_notification_poll_interval_ms(),
            notification_limit: None,
            session_check_interval_ms: default_session_check_interval_ms(),
            credential_path: None,
            download_dir: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_upload_timeout_secs() -> u64 {
    120
}

fn default_notification_poll_interval_ms() -> u64 {
    3000
}

fn default_session_check_interval_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default location of `config.toml` for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Default credential file for the platform
pub fn default_credential_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("credential"))
        .unwrap_or_else(|| PathBuf::from(".lca_credential"))
}

/// Default directory for downloaded artifacts
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Load a TOML config file
///
/// A missing file yields defaults with a warning. A file that exists but
/// cannot be read or parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub credential_path: Option<PathBuf>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub upload_timeout: Duration,
    pub notification_poll_interval: Duration,
    pub notification_limit: Option<u32>,
    pub session_check_interval: Duration,
    pub credential_path: PathBuf,
    pub download_dir: PathBuf,
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Resolve configuration from CLI overrides, environment, TOML and defaults
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let toml_config = match config_path {
            Some(path) => load_toml_config(&path)?,
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                TomlConfig::default()
            }
        };

        Self::from_toml(toml_config, &overrides)
    }

    /// Apply CLI and environment overrides on top of a parsed TOML config
    pub fn from_toml(toml_config: TomlConfig, overrides: &ConfigOverrides) -> Result<Self> {
        let backend_url = overrides
            .backend_url
            .clone()
            .or_else(|| non_empty_env(ENV_BACKEND_URL))
            .unwrap_or(toml_config.backend_url);
        validate_backend_url(&backend_url)?;

        let credential_path = overrides
            .credential_path
            .clone()
            .or_else(|| non_empty_env(ENV_CREDENTIAL_PATH).map(PathBuf::from))
            .or(toml_config.credential_path)
            .unwrap_or_else(default_credential_path);

        if toml_config.upload_timeout_secs == 0 {
            return Err(Error::Config("upload_timeout_secs must be positive".to_string()));
        }
        if toml_config.notification_poll_interval_ms == 0 {
            return Err(Error::Config(
                "notification_poll_interval_ms must be positive".to_string(),
            ));
        }
        if toml_config.session_check_interval_ms == 0 {
            return Err(Error::Config(
                "session_check_interval_ms must be positive".to_string(),
            ));
        }

        Ok(Self {
            backend_url,
            upload_timeout: Duration::from_secs(toml_config.upload_timeout_secs),
            notification_poll_interval: Duration::from_millis(
                toml_config.notification_poll_interval_ms,
            ),
            notification_limit: toml_config.notification_limit,
            session_check_interval: Duration::from_millis(toml_config.session_check_interval_ms),
            credential_path,
            download_dir: toml_config
                .download_dir
                .unwrap_or_else(default_download_dir),
            logging: toml_config.logging,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let toml_config = TomlConfig::default();
        Self {
            backend_url: toml_config.backend_url,
            upload_timeout: Duration::from_secs(toml_config.upload_timeout_secs),
            notification_poll_interval: Duration::from_millis(
                toml_config.notification_poll_interval_ms,
            ),
            notification_limit: None,
            session_check_interval: Duration::from_millis(toml_config.session_check_interval_ms),
            credential_path: default_credential_path(),
            download_dir: default_download_dir(),
            logging: toml_config.logging,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn validate_backend_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "backend_url must be an absolute http(s) URL, got '{}'",
            url
        )))
    }
}
