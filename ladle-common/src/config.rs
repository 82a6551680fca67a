//! Configuration loading and data directory resolution
//!
//! Resolution priority for every setting: command-line argument → environment
//! variable → TOML config file → compiled default.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// TOML configuration file contents (`~/.config/ladle/ladle-ri.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Data directory holding the SQLite database
    pub data_dir: Option<String>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Import pipeline configuration
    #[serde(default)]
    pub import: ImportTomlConfig,
}

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Import section of the TOML config; every field optional so partial files
/// merge over the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportTomlConfig {
    pub concurrency: Option<usize>,
    pub job_timeout_ms: Option<u64>,
    pub backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

/// Resolved import pipeline configuration
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Number of concurrent import workers
    pub concurrency: usize,
    /// Per-job-attempt timeout in milliseconds
    pub job_timeout_ms: u64,
    /// Initial retry backoff in milliseconds
    pub backoff_ms: u64,
    /// Upper bound on the exponential backoff delay
    pub max_backoff_ms: u64,
    /// Maximum retries per stage for retryable errors
    pub max_retries: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            job_timeout_ms: 120_000,
            backoff_ms: 500,
            max_backoff_ms: 30_000,
            max_retries: 3,
        }
    }
}

impl ImportConfig {
    /// Resolve the import configuration with ENV → TOML → default priority.
    ///
    /// Environment variables: `LADLE_IMPORT_CONCURRENCY`,
    /// `LADLE_IMPORT_JOB_TIMEOUT_MS`, `LADLE_IMPORT_BACKOFF_MS`,
    /// `LADLE_IMPORT_MAX_BACKOFF_MS`, `LADLE_IMPORT_MAX_RETRIES`.
    pub fn resolve(toml: &TomlConfig) -> Self {
        let defaults = Self::default();
        Self {
            concurrency: env_or("LADLE_IMPORT_CONCURRENCY")
                .or(toml.import.concurrency)
                .unwrap_or(defaults.concurrency),
            job_timeout_ms: env_or("LADLE_IMPORT_JOB_TIMEOUT_MS")
                .or(toml.import.job_timeout_ms)
                .unwrap_or(defaults.job_timeout_ms),
            backoff_ms: env_or("LADLE_IMPORT_BACKOFF_MS")
                .or(toml.import.backoff_ms)
                .unwrap_or(defaults.backoff_ms),
            max_backoff_ms: env_or("LADLE_IMPORT_MAX_BACKOFF_MS")
                .or(toml.import.max_backoff_ms)
                .unwrap_or(defaults.max_backoff_ms),
            max_retries: env_or("LADLE_IMPORT_MAX_RETRIES")
                .or(toml.import.max_retries)
                .unwrap_or(defaults.max_retries),
        }
    }
}

/// Parse an environment variable, warning on unparseable values instead of
/// failing startup.
fn env_or<T: std::str::FromStr>(name: &str) -> Option<T> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring unparseable {}={:?}", name, raw);
                None
            }
        },
        Err(_) => None,
    }
}

/// Default configuration file path for the platform
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ladle").join("ladle-ri.toml"))
}

/// Load the TOML config file, falling back to defaults when absent.
///
/// A present-but-invalid file is an error: silently ignoring a typo in an
/// operator-written config masks misconfiguration.
pub fn load_toml_config() -> Result<TomlConfig> {
    let Some(path) = config_file_path() else {
        return Ok(TomlConfig::default());
    };
    load_toml_config_from(&path)
}

/// Load a TOML config from an explicit path (used by tests)
pub fn load_toml_config_from(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse config failed: {}", e)))
}

/// Resolve the data directory:
/// 1. Command-line argument (highest priority)
/// 2. `LADLE_DATA_DIR` environment variable
/// 3. TOML config file
/// 4. OS-dependent default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&str>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }
    if let Ok(path) = std::env::var("LADLE_DATA_DIR") {
        return PathBuf::from(path);
    }
    if let Some(path) = &toml.data_dir {
        return PathBuf::from(path);
    }
    default_data_dir()
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ladle"))
        .unwrap_or_else(|| PathBuf::from("./ladle_data"))
}

/// Ensure the data directory exists and return the database path inside it
pub fn ensure_data_dir(data_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("ladle.db"))
}
