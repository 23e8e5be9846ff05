use anyhow::{bail, Context, Result};
use clap::{Command, CommandFactory, FromArgMatches, Parser, ValueEnum};
use sabnzbd_exporter::{
    client::SabnzbdClient,
    config::{register_flags, BaseConfig, FlagSet, SabnzbdConfig},
    SabnzbdError,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SABNZBD_COMMAND: &str = "sabnzbd";

/// Sabnzbd Exporter - Prometheus metrics exporter for Sabnzbd
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, subcommand_required = true)]
struct Cli {
    /// Sabnzbd base URL
    #[arg(long, env = "URL", default_value = "")]
    url: String,

    /// Sabnzbd API key
    #[arg(long = "api-key", env = "APIKEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// Skip TLS certificate verification
    #[arg(long, env = "DISABLE_SSL_VERIFY")]
    disable_ssl_verify: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    fn base_config(&self) -> BaseConfig {
        BaseConfig {
            app: SABNZBD_COMMAND.to_string(),
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            disable_ssl_verify: self.disable_ssl_verify,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let mut command = Cli::command().subcommand(register_flags(
        Command::new(SABNZBD_COMMAND)
            .visible_alias("sab")
            .about("Prometheus Exporter for Sabnzbd"),
    ));
    let matches = command.get_matches_mut();
    let cli = Cli::from_arg_matches(&matches)?;

    // Initialize logging
    init_logging(&cli.log_level, cli.log_format)?;

    let flags = match matches.subcommand() {
        Some((SABNZBD_COMMAND, sub_matches)) => {
            let sub_command = command
                .find_subcommand(SABNZBD_COMMAND)
                .cloned()
                .context("sabnzbd command is not registered")?;
            FlagSet::new(sub_command, sub_matches.clone())
        }
        Some((name, _)) => bail!("unknown command: {}", name),
        None => bail!("no command given"),
    };

    if let Err(e) = run_sabnzbd(&cli.base_config(), &flags).await {
        error!("Sabnzbd exporter failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

async fn run_sabnzbd(base: &BaseConfig, flags: &FlagSet) -> Result<()> {
    info!("Starting Sabnzbd Exporter");

    // Load configuration
    let config =
        SabnzbdConfig::load(base, flags).context("failed to load Sabnzbd configuration")?;
    config.validate().map_err(SabnzbdError::Validation)?;

    info!("Sabnzbd endpoint: {}", config.url);
    if !config.ini_config.is_empty() {
        info!("Settings file: {}", config.ini_config);
    }

    // Create Sabnzbd client
    let client = SabnzbdClient::new(&config)?;
    info!("Sabnzbd client initialized");

    let version = client
        .get_version()
        .await
        .context("failed to reach the Sabnzbd API")?;
    info!("Connected to Sabnzbd {}", version.version);

    Ok(())
}

/// Initialize structured logging with tracing.
fn init_logging(log_level: &str, format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    Ok(())
}
