//! # Keystone
//!
//! Runs the provisioning bot on the gateway, or performs a single sync or
//! capture from the command line:
//! - `keystone serve` registers the slash commands and waits for interactions
//! - `keystone setup <server>` reconciles one server unattended
//! - `keystone snapshot <server>` writes a server's layout to a structure file

mod commands;
mod summary;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use keystone_common::blueprint::Blueprint;
use keystone_common::config::AppConfig;
use keystone_provision::document::capture_path;
use keystone_provision::{CaptureMode, Orchestrator, Pacing};
use keystone_sdk::PlatformClient;

use crate::commands::BotState;

#[derive(Debug, Parser)]
#[command(name = "keystone", version, about = "Declarative role and channel provisioning")]
struct Cli {
    /// Config file stem, without extension.
    #[arg(long, short, env = "KEYSTONE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to the gateway and serve slash commands (default).
    Serve,
    /// Reconcile one server against the blueprint and structure document.
    Setup {
        server_id: String,
        /// Structure document to apply instead of the configured one.
        #[arg(long)]
        structure: Option<PathBuf>,
    },
    /// Capture a server's channel layout into a structure document.
    Snapshot {
        server_id: String,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Named categories only, skipping uncategorized channels.
        #[arg(long)]
        legacy: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = keystone_common::config::init(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keystone=info".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("Starting Keystone v{}", env!("CARGO_PKG_VERSION"));

    let blueprint = Arc::new(Blueprint::load(&config.provisioning.blueprint_path)?);
    let orchestrator = Orchestrator::new(blueprint, Pacing::from(&config.pacing));
    let client = PlatformClient::new(
        config.bot.token.as_str(),
        Some(config.platform.rest_url.as_str()),
        Some(config.platform.gateway_url.as_str()),
    )?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, client, orchestrator).await,
        Command::Setup { server_id, structure } => {
            let structure =
                structure.unwrap_or_else(|| PathBuf::from(&config.provisioning.structure_path));
            let report =
                commands::provision(&client.rest, &orchestrator, &server_id, &structure).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_clean() {
                tracing::warn!(errors = report.total_errors(), "Sync finished with errors");
            }
            Ok(())
        }
        Command::Snapshot { server_id, out, legacy } => {
            let (mode, default_out) = if legacy {
                (CaptureMode::Legacy, capture_path(&server_id))
            } else {
                (CaptureMode::Full, PathBuf::from(&config.provisioning.structure_path))
            };
            let out = out.unwrap_or(default_out);
            let document = commands::capture(&client.rest, &server_id, mode, &out).await?;
            tracing::info!(
                server_id = %server_id,
                path = %out.display(),
                categories = document.categories.len(),
                "Snapshot written"
            );
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, mut client: PlatformClient, orchestrator: Orchestrator) -> anyhow::Result<()> {
    let application_id = config.bot.application_id.clone();
    let state = Arc::new(BotState { rest: client.rest.clone(), config, orchestrator });
    commands::register(&mut client, state);

    client.login(&application_id).await?;
    tracing::info!("Gateway connected, serving commands");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
