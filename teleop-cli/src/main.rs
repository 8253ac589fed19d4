mod operator;
mod robot;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use teleop_bridge::BridgeConfig;
use teleop_core::{Role, RoomId};
use teleop_relay::RelayServer;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "teleop")]
#[command(about = "Robot teleoperation bridge, operator console and signaling relay")]
struct Cli {
    /// JSON bridge configuration. Environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Signaling relay websocket URL.
    #[arg(long, global = true)]
    signaling_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the robot side: read the identity, join its room and bridge
    /// operator commands to the robot.
    Robot {
        #[arg(long)]
        identity_file: Option<PathBuf>,

        /// Publish a synthetic point cloud this many times per second.
        #[arg(long)]
        synthetic_cloud_hz: Option<u32>,
    },
    /// Join a robot's room as an operator and send JSON commands read from
    /// stdin, one per line.
    Operator {
        /// Robot identity to connect to.
        room: String,

        /// Announce as a browser instead of a workstation.
        #[arg(long)]
        browser: bool,
    },
    /// Serve the signaling relay.
    Relay {
        #[arg(long, default_value = "0.0.0.0:8443")]
        listen: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = BridgeConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.signaling_url {
        config.signaling_url = url;
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("{}", "Shutting down...".yellow());
                cancel.cancel();
            }
        }
    });

    match cli.command {
        Commands::Robot {
            identity_file,
            synthetic_cloud_hz,
        } => {
            if let Some(path) = identity_file {
                config.identity_file = path;
            }
            config.role = Role::Robot;
            robot::run(config, synthetic_cloud_hz, cancel).await
        }
        Commands::Operator { room, browser } => {
            config.role = if browser {
                Role::Browser
            } else {
                Role::Workstation
            };
            operator::run(config, RoomId::from(room), cancel).await
        }
        Commands::Relay { listen } => {
            let server = RelayServer::bind(&listen).await?;
            println!(
                "{} {}",
                "📡 Signaling relay listening on".green().bold(),
                server.url()?
            );
            server.run_until(cancel).await
        }
    }
}
