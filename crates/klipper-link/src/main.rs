//! klipper-link - Moonraker connection client
//!
//! Watches a Klipper printer over the Moonraker WebSocket and manages the
//! printer's Wi-Fi through the network configuration service.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use klipper_link::{KlipperConfig, KlipperService, NetworkApi};
use klipper_proto::WifiConnectionRequest;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "klipper-link")]
#[command(about = "Moonraker connection client")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "KLIPPER_LINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and print status changes until Ctrl-C
    Watch,

    /// Print the resolved configuration
    Config,

    /// Manage the printer's Wi-Fi
    Wifi {
        #[command(subcommand)]
        command: WifiCommands,
    },
}

#[derive(Subcommand)]
enum WifiCommands {
    /// Show adapter, address and signal information
    Status,

    /// List visible networks
    Networks,

    /// Join a network
    Connect {
        /// Network name
        #[arg(long)]
        ssid: String,

        /// Network password, if secured
        #[arg(long)]
        password: Option<String>,
    },

    /// Leave the current network
    Disconnect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("klipper_link=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch => {
            let config = KlipperConfig::load(cli.config.as_deref())?;
            watch(&config).await?;
        }

        Commands::Config => {
            let config = KlipperConfig::resolve(cli.config.as_deref())?;
            show_config(&config)?;
        }

        Commands::Wifi { command } => {
            let config = KlipperConfig::resolve(cli.config.as_deref())?;
            wifi(&NetworkApi::new(&config.network_api_url), command).await?;
        }
    }

    Ok(())
}

async fn watch(config: &KlipperConfig) -> anyhow::Result<()> {
    let service = KlipperService::new(config.connection_config());
    info!(
        printer = %config.printer_name,
        url = %service.endpoint_url(),
        "Connecting to Klipper"
    );

    service.connection().subscribe(|status| {
        let state = if status.connected {
            "connected"
        } else if status.connecting {
            "connecting"
        } else {
            "disconnected"
        };
        match &status.error {
            Some(err) => println!("connection: {state} ({err})"),
            None => println!("connection: {state}"),
        }
    });

    service.printer().subscribe(|snapshot| {
        if let Some(status) = snapshot {
            match serde_json::to_string(status) {
                Ok(json) => println!("printer: {json}"),
                Err(e) => error!(error = %e, "Failed to encode printer status"),
            }
        }
    });

    if let Err(e) = service.connect().await {
        error!(error = %e, "Initial connection failed");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    service.disconnect();

    Ok(())
}

fn show_config(config: &KlipperConfig) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    println!();
    println!("# websocket url: {}", config.ws_url());
    println!("# api url:       {}", config.api_url());

    let errors = config.validation_errors();
    if errors.is_empty() {
        println!("# configuration is valid");
    } else {
        for err in &errors {
            println!("# error: {err}");
        }
    }
    Ok(())
}

async fn wifi(api: &NetworkApi, command: WifiCommands) -> anyhow::Result<()> {
    match command {
        WifiCommands::Status => {
            let status = api.get_network_status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        WifiCommands::Networks => {
            let scan = api.scan_networks().await?;
            for network in &scan.networks {
                println!(
                    "{:<32} {:>4}  {:<10} {:>6}{}",
                    network.ssid,
                    network.signal_strength,
                    network.security,
                    network.frequency,
                    if network.is_hidden { "  (hidden)" } else { "" }
                );
            }
        }

        WifiCommands::Connect { ssid, password } => {
            let result = api
                .connect_to_network(&WifiConnectionRequest { ssid, password })
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        WifiCommands::Disconnect => {
            let response = api.disconnect_network().await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
