//! ProxLock CLI
//!
//! Inspects and sends requests the way an application using the ProxLock
//! client would, useful for checking an integration from a terminal or CI.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::debug;
use secrecy::SecretString;

use proxlock_client::ProxLockClient;
use proxlock_client::attestation::{UnavailableDeviceCheck, select_provider};
use proxlock_common::{ProxLockConfig, SessionContext};

mod commands;
mod display;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    /// Defaults to `<config dir>/proxlock/config.toml` when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Partial key issued for the third-party API key
    #[arg(long, env = "PROXLOCK_PARTIAL_KEY", global = true, hide_env_values = true)]
    partial_key: Option<String>,

    /// Association ID of the integration
    #[arg(long, env = "PROXLOCK_ASSOCIATION_ID", global = true)]
    association_id: Option<String>,

    /// Override the proxy endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the proxy request without sending it
    Inspect {
        #[command(flatten)]
        request: RequestArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send the request through the proxy
    Send {
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Print the bearer-token placeholder for the partial key
    Placeholder,
}

/// The request as the application would address the third-party API.
#[derive(clap::Args, Debug)]
struct RequestArgs {
    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Destination URL
    #[arg(long)]
    url: String,

    /// Extra header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long)]
    data: Option<String>,
}

/// Loads the configuration file, if any.
///
/// An explicit `--config` must exist; the default path is optional.
fn load_config_file(explicit: Option<&Path>) -> Result<Option<ProxLockConfig>> {
    if let Some(path) = explicit {
        let config = ProxLockConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        return Ok(Some(config));
    }

    let Ok(path) = ProxLockConfig::config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        debug!("No config file at {}", path.display());
        return Ok(None);
    }

    let config = ProxLockConfig::load_from(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok(Some(config))
}

/// Layers command-line values over the file configuration.
fn resolve_config(file: Option<ProxLockConfig>, cli: &Cli) -> Result<ProxLockConfig> {
    let mut config = match file {
        Some(mut config) => {
            if cli.partial_key.is_some() || cli.association_id.is_some() {
                let partial_key = cli
                    .partial_key
                    .clone()
                    .unwrap_or_else(|| config.session.partial_key().to_string());
                let association_id = cli
                    .association_id
                    .clone()
                    .unwrap_or_else(|| config.session.association_id().to_string());
                config.session = SessionContext::new(partial_key, association_id);
            }
            config
        }
        None => {
            let (Some(partial_key), Some(association_id)) =
                (cli.partial_key.clone(), cli.association_id.clone())
            else {
                bail!(
                    "Partial key and association ID must be provided via --partial-key/--association-id, \
                     PROXLOCK_PARTIAL_KEY/PROXLOCK_ASSOCIATION_ID or a config file"
                );
            };
            ProxLockConfig::new(SessionContext::new(partial_key, association_id))
        }
    };

    if let Some(endpoint) = &cli.endpoint {
        config.http.endpoint.clone_from(endpoint);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_client(config: &ProxLockConfig) -> Result<ProxLockClient> {
    let bypass = std::env::var(&config.attestation.bypass_env)
        .ok()
        .map(SecretString::from);
    debug!(
        "Attestation environment {}, bypass {}",
        config.attestation.environment,
        if bypass.is_some() { "set" } else { "unset" }
    );

    let attestation = select_provider(
        config.attestation.environment,
        UnavailableDeviceCheck,
        bypass,
    );

    Ok(ProxLockClient::new(
        config.session.clone(),
        attestation,
        &config.http,
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let file = load_config_file(cli.config.as_deref())?;
    let config = resolve_config(file, &cli)?;

    match &cli.command {
        Command::Placeholder => {
            commands::placeholder(&config.session);
        }
        Command::Inspect { request, json } => {
            let client = build_client(&config)?;
            commands::inspect(&client, request, *json).await?;
        }
        Command::Send { request } => {
            let client = build_client(&config)?;
            commands::send(&client, request).await?;
        }
    }

    Ok(())
}
