//! Error types for the relay server.
//!
//! Only configuration and startup can fail outward. Everything that goes
//! wrong on an individual connection stays inside that connection's
//! worker and ends it.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An environment override did not parse.
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Fatal server startup errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listen address could not be resolved.
    #[error("failed to resolve listen address {addr}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The listen address resolved to nothing.
    #[error("listen address {0} did not resolve to any socket address")]
    NoAddress(String),

    /// Creating, binding or listening on the socket failed.
    #[error("failed to listen on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
