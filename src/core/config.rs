//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.restloader/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::loader::executor::DEFAULT_USER_AGENT;
use crate::loader::{HttpVerb, Request};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RestLoaderConfig {
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RequestConfig {
    pub endpoint: Option<String>,
    pub method: Option<HttpVerb>,
    pub params: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HttpConfig {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub file: Option<String>,
}

/// Values given on the command line. `None`/empty means "not specified".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub method: Option<HttpVerb>,
    pub endpoint: Option<String>,
    pub params: Vec<(String, String)>,
    pub timeout_secs: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_ENDPOINT: &str = "http://search.twitter.com/search.json";
pub const DEFAULT_QUERY: (&str, &str) = ("q", "android");
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILE: &str = "restloader.log";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub method: HttpVerb,
    pub endpoint: String,
    pub params: BTreeMap<String, String>,
    pub timeout: Duration,
    pub user_agent: String,
    pub log_file: PathBuf,
}

impl ResolvedConfig {
    /// The request the host loads on startup.
    pub fn request(&self) -> Request {
        Request::new(self.method, self.endpoint.clone()).params_from(self.params.clone())
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.restloader/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".restloader").join("config.toml"))
}

/// Load config from `~/.restloader/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `RestLoaderConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<RestLoaderConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(RestLoaderConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<RestLoaderConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(RestLoaderConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: RestLoaderConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# restloader configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [request]
# endpoint = "http://search.twitter.com/search.json"   # Or RESTLOADER_ENDPOINT
# method = "get"                     # "get", "post", "put", "delete"

# [request.params]
# q = "android"

# [http]
# timeout_secs = 30                  # Or RESTLOADER_TIMEOUT_SECS
# user_agent = "restloader/0.1.0"

# [logging]
# file = "restloader.log"            # Or RESTLOADER_LOG_FILE
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &RestLoaderConfig, cli: &CliOverrides) -> ResolvedConfig {
    // Endpoint: CLI → env → config → default
    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| std::env::var("RESTLOADER_ENDPOINT").ok())
        .or_else(|| config.request.endpoint.clone())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let method = cli
        .method
        .or(config.request.method)
        .unwrap_or_default();

    // Params: config table replaces the default query, CLI pairs are layered on top
    let mut params = config.request.params.clone().unwrap_or_else(|| {
        BTreeMap::from([(DEFAULT_QUERY.0.to_string(), DEFAULT_QUERY.1.to_string())])
    });
    params.extend(cli.params.iter().cloned());

    // Timeout: CLI → env → config → default
    let timeout_secs = cli
        .timeout_secs
        .or_else(|| env_timeout_secs("RESTLOADER_TIMEOUT_SECS"))
        .or(config.http.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    // Log file: env → config → default
    let log_file = std::env::var("RESTLOADER_LOG_FILE")
        .ok()
        .or_else(|| config.logging.file.clone())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());

    ResolvedConfig {
        method,
        endpoint,
        params,
        timeout: Duration::from_secs(timeout_secs),
        user_agent: config
            .http
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        log_file: PathBuf::from(log_file),
    }
}

fn env_timeout_secs(var: &str) -> Option<u64> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(secs) => Some(secs),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", var, raw, e);
            None
        }
    }
}

/// Parses a `key=value` CLI argument.
pub fn parse_param(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{arg}`"))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in `{arg}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
