//! # Sabnzbd Exporter
//!
//! Configuration front-end of a Prometheus exporter for Sabnzbd.
//!
//! ## Overview
//!
//! This crate resolves everything the exporter needs to talk to a Sabnzbd
//! instance:
//!
//! - Layered configuration from environment variables and command-line flags
//! - Authentication and address discovery from Sabnzbd's own `sabnzbd.ini`
//! - Validation with a report of every invalid field
//! - An API client built from the resolved configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Command;
//! use sabnzbd_exporter::{
//!     client::SabnzbdClient,
//!     config::{register_flags, BaseConfig, FlagSet, SabnzbdConfig},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Parse flags
//!     let flags = FlagSet::try_parse_from(
//!         register_flags(Command::new("sabnzbd")),
//!         ["sabnzbd", "--config", "/config/sabnzbd.ini"],
//!     )?;
//!
//!     // Load and validate configuration
//!     let base = BaseConfig {
//!         app: "sabnzbd".to_string(),
//!         url: "http://localhost:8080".to_string(),
//!         ..Default::default()
//!     };
//!     let config = SabnzbdConfig::load(&base, &flags)?;
//!     config.validate()?;
//!
//!     // Talk to Sabnzbd
//!     let client = SabnzbdClient::new(&config)?;
//!     println!("Sabnzbd {}", client.get_version().await?.version);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The exporter can be configured via:
//! - Environment variables (`API_KEY`, `URL`, `MISC__HOST`, ...)
//! - Command-line arguments (`--config`, or `SAB_CONFIG`)
//! - Sabnzbd's `sabnzbd.ini`
//!
//! See [`config::SabnzbdConfig`] for details.
//!
//! ## Modules
//!
//! - [`client`] - Sabnzbd API client
//! - [`config`] - Configuration resolution and validation
//! - [`error`] - Error types and handling

pub mod client;
pub mod config;
pub mod error;

pub use error::{Result, SabnzbdError};
