//! Gateway configuration.
//!
//! Configuration can be loaded from:
//! - a TOML file (default: ~/.config/notesync/gateway.toml)
//! - environment variables (NOTESYNC_* prefixed)
//!
//! # Example
//!
//! ```rust,no_run
//! use notesync_gateway::config::GatewayConfig;
//!
//! // Load from default path or fall back to env vars
//! let config = GatewayConfig::load().expect("Failed to load config");
//!
//! // Or explicitly from a file
//! let config = GatewayConfig::from_file(std::path::Path::new("gateway.toml")).expect("Failed to load");
//! ```
//!
//! The file format:
//!
//! ```toml
//! [gateway]
//! record_base_url = "https://records.example.com/v1"
//! storage_base_url = "https://storage.example.com"
//! api_key = "${NOTESYNC_API_KEY}"
//! timeout_secs = 60
//! url_expiry_secs = 900
//! ```

use std::env;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use notesync_core::defaults::{HTTP_TIMEOUT_SECS, URL_EXPIRY_SECS};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for notesync_core::Error {
    fn from(e: ConfigError) -> Self {
        notesync_core::Error::Config(e.to_string())
    }
}

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid"));

/// Connection settings for the record and storage services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the record service API.
    pub record_base_url: String,
    /// Base URL of the object storage API.
    pub storage_base_url: String,
    /// Bearer token sent to both services (optional for local endpoints).
    #[serde(default)]
    pub api_key: Option<String>,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Requested validity of resolved image URLs in seconds.
    #[serde(default = "default_url_expiry_secs")]
    pub url_expiry_secs: u64,
}

fn default_timeout_secs() -> u64 {
    HTTP_TIMEOUT_SECS
}

fn default_url_expiry_secs() -> u64 {
    URL_EXPIRY_SECS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            record_base_url: "http://127.0.0.1:4000".to_string(),
            storage_base_url: "http://127.0.0.1:4001".to_string(),
            api_key: None,
            timeout_secs: HTTP_TIMEOUT_SECS,
            url_expiry_secs: URL_EXPIRY_SECS,
        }
    }
}

impl GatewayConfig {
    /// Get the default config file path.
    ///
    /// Returns: ~/.config/notesync/gateway.toml
    pub fn default_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("notesync");
        path.push("gateway.toml");
        path
    }

    /// Load configuration from the default path, falling back to environment variables.
    pub fn load() -> ConfigResult<Self> {
        let path = Self::default_config_path();

        if path.exists() {
            info!("Loading gateway config from: {}", path.display());
            Self::from_file(&path)
        } else {
            debug!(
                "Config file not found at {}, using environment variables",
                path.display()
            );
            let config = Self::from_env();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text with `${VAR}` substitution.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let content = Self::substitute_env_vars(content);

        #[derive(Deserialize)]
        struct TomlRoot {
            gateway: GatewayConfig,
        }

        let root: TomlRoot = toml::from_str(&content)?;
        root.gateway.validate()?;
        Ok(root.gateway)
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `NOTESYNC_RECORD_URL` | `http://127.0.0.1:4000` |
    /// | `NOTESYNC_STORAGE_URL` | `http://127.0.0.1:4001` |
    /// | `NOTESYNC_API_KEY` | (none) |
    /// | `NOTESYNC_TIMEOUT_SECS` | `60` |
    /// | `NOTESYNC_URL_EXPIRY_SECS` | `900` |
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            record_base_url: env::var("NOTESYNC_RECORD_URL").unwrap_or(default.record_base_url),
            storage_base_url: env::var("NOTESYNC_STORAGE_URL")
                .unwrap_or(default.storage_base_url),
            api_key: env::var("NOTESYNC_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_secs: env::var("NOTESYNC_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.timeout_secs),
            url_expiry_secs: env::var("NOTESYNC_URL_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.url_expiry_secs),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, url) in [
            ("record_base_url", &self.record_base_url),
            ("storage_base_url", &self.storage_base_url),
        ] {
            if url.is_empty() {
                return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "{} must start with http:// or https://, got: {}",
                    name, url
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.url_expiry_secs == 0 {
            return Err(ConfigError::Validation(
                "url_expiry_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Substitute environment variables in the format ${VAR_NAME}.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }
}
