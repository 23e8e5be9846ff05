//! Error types for the Sabnzbd exporter.
//!
//! This module defines custom error types using `thiserror` for structured
//! error handling throughout the application.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ValidationErrors;

/// Main error type for Sabnzbd exporter operations.
#[derive(Debug, Error)]
pub enum SabnzbdError {
    /// Error communicating with the Sabnzbd API
    #[error("Sabnzbd API error: {0}")]
    Api(#[from] reqwest::Error),

    /// Error parsing a Sabnzbd API response
    #[error("Failed to parse Sabnzbd API response: {0}")]
    ParseError(String),

    /// Configuration decode error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A configuration file could not be read
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Malformed configuration provider input
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A URL could not be parsed while merging configuration layers
    #[error("Failed to parse {context}: {source}")]
    Url {
        /// Which URL was being parsed
        context: &'static str,
        /// Underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// Operation not supported by a configuration parser
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// Configuration failed validation
    #[error("Invalid configuration:\n{0}")]
    Validation(#[from] ValidationErrors),
}

/// Result type alias for Sabnzbd exporter operations.
pub type Result<T> = std::result::Result<T, SabnzbdError>;
