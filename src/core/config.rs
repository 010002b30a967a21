//! Configuration for the relay server and chat client.
//!
//! Values come from a TOML file in the platform config directory with
//! compiled-in defaults for everything; `PORT` in the environment overrides
//! the configured listen port, matching the usual deployment convention.

use crate::core::constants::{DEFAULT_MODEL, DEFAULT_PORT, DEFAULT_SYSTEM_PROMPT, MAX_OUTPUT_TOKENS};
use directories::ProjectDirs;
use serde::Deserialize;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        /// Path to the configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        /// Path to the configuration file with invalid TOML.
        path: PathBuf,
        /// The TOML deserialization error.
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen port for the relay server.
    pub port: u16,
    /// Origins admitted by the relay's CORS policy.
    pub allowed_origins: Vec<String>,
    /// Model identifier forwarded with every completion request.
    pub model: String,
    /// Maximum output tokens per completion.
    pub max_tokens: u32,
    /// Base URL of the completion API.
    pub anthropic_base_url: String,
    /// Replaces the built-in default system prompt when set.
    pub system_prompt: Option<String>,
    /// Directory holding a bundled frontend to serve at the root route.
    pub static_dir: Option<PathBuf>,
    /// Relay endpoint the chat client talks to.
    pub relay_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3002".to_string(),
            ],
            model: DEFAULT_MODEL.to_string(),
            max_tokens: MAX_OUTPUT_TOKENS,
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            system_prompt: None,
            static_dir: None,
            relay_url: None,
        }
    }
}

impl Config {
    /// Load configuration from the default path, applying environment
    /// overrides. A missing file yields the defaults.
    pub fn load() -> Result<Config, Box<dyn StdError>> {
        let mut config = Self::load_from_path(&Self::config_path())?;

        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!("ignoring non-numeric PORT value {port:?}"),
            }
        }

        Ok(config)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, Box<dyn StdError>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            })?;
            let config: Config =
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: config_path.to_path_buf(),
                    source,
                })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// The system prompt used when a request does not carry one.
    pub fn default_system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Where the chat client sends its requests.
    pub fn relay_url(&self) -> String {
        self.relay_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    fn config_path() -> PathBuf {
        match ProjectDirs::from("org", "solace", "solace") {
            Some(proj_dirs) => proj_dirs.config_dir().join("config.toml"),
            None => PathBuf::from("config.toml"),
        }
    }
}
