//! Configuration management for the Sabnzbd exporter.
//!
//! Values are resolved in layers, each later layer taking precedence:
//!
//! 1. Defaults
//! 2. Environment variables (every variable; `SAB__FOO_BAR` becomes `sab.foo-bar`)
//! 3. Command-line flags (`--config`, or its `SAB_CONFIG` alias)
//! 4. `sabnzbd.ini`, when a config path was resolved by the layers above
//!
//! The result is decoded on top of the [`BaseConfig`] supplied by the root
//! command, then checked with [`SabnzbdConfig::validate`].

pub mod flags;
pub mod ini;
pub mod store;
mod validate;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::Result;
use flags::CONFIG_KEY;
use ini::IniParser;
use store::{Layer, Store, Value};

pub use flags::{register_flags, FlagSet, CONFIG_ENV};
pub use validate::{FieldError, ValidationErrors};

/// Settings shared by every exporter, supplied by the root command.
#[derive(Clone, Default)]
pub struct BaseConfig {
    /// Exporter identity (e.g., "sabnzbd")
    pub app: String,

    /// Sabnzbd base URL (e.g., "http://localhost:8080")
    pub url: String,

    /// Sabnzbd API key
    pub api_key: String,

    /// Skip TLS certificate verification
    pub disable_ssl_verify: bool,
}

impl std::fmt::Debug for BaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseConfig")
            .field("app", &self.app)
            .field("url", &self.url)
            .field("api_key", &"***REDACTED***")
            .field("disable_ssl_verify", &self.disable_ssl_verify)
            .finish()
    }
}

/// Resolved Sabnzbd exporter configuration.
#[derive(Clone, Default, Deserialize)]
pub struct SabnzbdConfig {
    /// Exporter identity, not user-configurable
    #[serde(default)]
    pub app: String,

    /// Path to `sabnzbd.ini`
    #[serde(default, rename = "config")]
    pub ini_config: String,

    /// Sabnzbd base URL
    #[serde(default)]
    pub url: String,

    /// Sabnzbd API key
    #[serde(default, rename = "api-key")]
    pub api_key: String,

    /// Skip TLS certificate verification
    #[serde(default, rename = "disable-ssl-verify")]
    pub disable_ssl_verify: bool,

    #[serde(skip)]
    store: Store,
}

impl std::fmt::Debug for SabnzbdConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SabnzbdConfig")
            .field("app", &self.app)
            .field("ini_config", &self.ini_config)
            .field("url", &self.url)
            .field("api_key", &"***REDACTED***")
            .field("disable_ssl_verify", &self.disable_ssl_verify)
            .finish()
    }
}

impl From<BaseConfig> for SabnzbdConfig {
    fn from(base: BaseConfig) -> Self {
        Self {
            app: base.app,
            url: base.url,
            api_key: base.api_key,
            disable_ssl_verify: base.disable_ssl_verify,
            ..Default::default()
        }
    }
}

impl SabnzbdConfig {
    /// Resolve the configuration from the process environment and `flags`.
    ///
    /// # Arguments
    ///
    /// * `base` - Values from the root command, used as defaults
    /// * `flags` - Parsed flags, see [`register_flags`]
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use clap::Command;
    /// use sabnzbd_exporter::config::{register_flags, BaseConfig, FlagSet, SabnzbdConfig};
    ///
    /// let flags = FlagSet::try_parse_from(
    ///     register_flags(Command::new("sabnzbd")),
    ///     ["sabnzbd", "--config", "/config/sabnzbd.ini"],
    /// )
    /// .unwrap();
    /// let base = BaseConfig {
    ///     url: "http://localhost:8080".to_string(),
    ///     ..Default::default()
    /// };
    ///
    /// let config = SabnzbdConfig::load(&base, &flags).unwrap();
    /// config.validate().unwrap();
    /// ```
    pub fn load(base: &BaseConfig, flags: &FlagSet) -> Result<Self> {
        let vars = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));
        Self::load_from_env(base, flags, vars)
    }

    /// Resolve the configuration from an explicit environment snapshot.
    ///
    /// Environment aliases declared on flags (such as `SAB_CONFIG`) are read
    /// by clap when the flags are parsed and are not affected by `vars`.
    pub fn load_from_env<I>(base: &BaseConfig, flags: &FlagSet, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut store = Store::new();

        store.load(Layer::from_json(&json!({}))?);

        let env: Layer = vars
            .into_iter()
            .map(|(name, value)| (env_key(&name), value))
            .collect();
        debug!(keys = env.len(), "Loaded environment layer");
        store.load(env);

        let flag_layer = flags.layer(&store);
        debug!(keys = flag_layer.len(), "Loaded flag layer");
        store.load(flag_layer);

        let ini_config = store.string(CONFIG_KEY);
        if !ini_config.is_empty() {
            info!("Loading Sabnzbd settings from {}", ini_config);
            let parser = IniParser::new();
            store.load_file(&ini_config, &parser, parser.merge(&base.url))?;
        }

        let mut config: SabnzbdConfig = store.decode([
            ("app", Value::from(base.app.as_str())),
            ("url", Value::from(base.url.as_str())),
            ("api-key", Value::from(base.api_key.as_str())),
            ("disable-ssl-verify", Value::from(base.disable_ssl_verify)),
        ])?;
        config.store = store;

        debug!(?config, "Resolved Sabnzbd configuration");
        Ok(config)
    }

    /// Raw value of any key seen while resolving, including unknown ones.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }
}

/// Map an environment variable name to a configuration key.
///
/// ```
/// use sabnzbd_exporter::config::env_key;
///
/// assert_eq!(env_key("SAB_CONFIG"), "sab-config");
/// assert_eq!(env_key("MISC__HTTPS_PORT"), "misc.https-port");
/// ```
pub fn env_key(name: &str) -> String {
    name.to_lowercase().replace("__", ".").replace('_', "-")
}
