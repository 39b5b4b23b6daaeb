//! Configuration for the relay server.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file,
//! 3. environment variables,
//! 4. command-line flags (applied by the binary).
//!
//! Environment variables:
//!
//! - `MCP_BIND_ADDR`    (default: "127.0.0.1")
//! - `MCP_PORT`         (default: "8080")
//! - `MCP_MAX_CLIENTS`  (default: "1024")
//! - `MCP_LOG_LEVEL`    (default: "info")
//! - `OPENAI_API_KEY`   (no default; `llm_request` fails without it)
//! - `OPENAI_BASE_URL`  (default: "https://api.openai.com/v1")

use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use mcp_protocol::wire_types::{DEFAULT_MAX_FRAME_LEN, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_BIND_ADDR: &str = "MCP_BIND_ADDR";
pub const ENV_PORT: &str = "MCP_PORT";
pub const ENV_MAX_CLIENTS: &str = "MCP_MAX_CLIENTS";
pub const ENV_LOG_LEVEL: &str = "MCP_LOG_LEVEL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on. `0` picks an ephemeral port.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Listen backlog handed to the OS.
    pub backlog: u32,

    /// Largest accepted request frame, in bytes.
    pub max_frame_len: usize,

    /// Log level used when neither `-v`/`-q` nor `RUST_LOG` say otherwise.
    pub log_level: String,

    /// Completion service settings.
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            max_clients: 1024,
            backlog: 128,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            log_level: "info".to_string(),
            llm: LlmConfig::default(),
        }
    }
}

/// Completion service (OpenAI-compatible chat API) settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model used when a request names none.
    pub default_model: String,
    /// Per-call HTTP timeout. `None` waits as long as the service takes.
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from `lookup` (the process environment in
    /// production). Unset keys leave the current value alone.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.bind_addr = addr;
        }
        if let Some(port) = parse_override(&lookup, ENV_PORT)? {
            self.port = port;
        }
        if let Some(max) = parse_override(&lookup, ENV_MAX_CLIENTS)? {
            self.max_clients = max;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.llm.base_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Validation("bind_addr must not be empty".to_string()));
        }
        if self.max_clients == 0 {
            return Err(ConfigError::Validation("max_clients must be at least 1".to_string()));
        }
        if self.max_frame_len == 0 {
            return Err(ConfigError::Validation("max_frame_len must be at least 1".to_string()));
        }
        if self.llm.default_model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "llm.default_model must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value: val,
            }),
        None => Ok(None),
    }
}
