//! Pokédex command line
//!
//! - `pokedex serve`  runs the REST API
//! - `pokedex browse` runs the terminal front end against a running API

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pokedex::{browse, init_client_logging, init_server_logging, serve};
use pokedex_core::PokedexConfig;

#[derive(Parser, Debug)]
#[command(name = "pokedex", version, about = "Pokédex API server and terminal browser")]
struct Cli {
    /// Configuration file (defaults to ./pokedex.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the REST API
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Browse Pokémon in the terminal
    Browse {
        /// Override the configured API base URL
        #[arg(long)]
        api_url: Option<String>,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config =
        PokedexConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { port } => {
            init_server_logging();
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(&config).await
        }
        Commands::Browse { api_url } => {
            let _guard = init_client_logging(&config.client.log_dir)?;
            if let Some(api_url) = api_url {
                config.client.api_base_url = api_url;
            }
            browse(&config).await
        }
    }
}
