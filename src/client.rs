//! Sabnzbd API client.
//!
//! This module builds outbound requests against the Sabnzbd HTTP API from a
//! validated [`SabnzbdConfig`].

use crate::config::SabnzbdConfig;
use crate::error::{Result, SabnzbdError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Request timeout for API calls.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Sabnzbd API client.
#[derive(Clone)]
pub struct SabnzbdClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SabnzbdClient {
    /// Create a new Sabnzbd API client.
    ///
    /// # Arguments
    ///
    /// * `config` - Resolved and validated Sabnzbd configuration
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sabnzbd_exporter::client::SabnzbdClient;
    /// use sabnzbd_exporter::config::{BaseConfig, SabnzbdConfig};
    ///
    /// let config = SabnzbdConfig::from(BaseConfig {
    ///     app: "sabnzbd".to_string(),
    ///     url: "http://localhost:8080".to_string(),
    ///     api_key: "abcdef0123456789abcdef0123456789".to_string(),
    ///     disable_ssl_verify: false,
    /// });
    /// let client = SabnzbdClient::new(&config).unwrap();
    /// ```
    pub fn new(config: &SabnzbdConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(config.disable_ssl_verify)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Get the Sabnzbd version.
    pub async fn get_version(&self) -> Result<VersionInfo> {
        let url = format!("{}/api", self.base_url);
        debug!("Fetching version from: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("mode", "version"),
                ("output", "json"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if let Err(e) = response.error_for_status_ref() {
            warn!("Failed to get version: {}", response.status());
            return Err(SabnzbdError::Api(e));
        }

        let body = response.text().await?;
        debug!("Raw API response: {}", body);

        let api_response: ApiResponse = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            SabnzbdError::ParseError(format!(
                "Failed to parse version: {}. Body preview: {}",
                e, preview
            ))
        })?;

        match api_response {
            ApiResponse {
                version: Some(version),
                ..
            } => Ok(VersionInfo { version }),
            ApiResponse {
                error: Some(error), ..
            } => Err(SabnzbdError::ParseError(format!(
                "Sabnzbd returned an error: {}",
                error
            ))),
            _ => Err(SabnzbdError::ParseError(
                "Sabnzbd response did not contain a version".to_string(),
            )),
        }
    }
}

/// Sabnzbd API response envelope for `mode=version`.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Sabnzbd version information.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionInfo {
    /// Sabnzbd version string
    pub version: String,
}
