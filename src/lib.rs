//! Pokédex
//!
//! Wiring for the `pokedex` binary: logging setup and construction of the
//! API server and the terminal client from a loaded [`PokedexConfig`].

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use pokedex_api::ApiServer;
use pokedex_client::PokedexClient;
use pokedex_core::{PokeApiClient, PokedexConfig};
use pokedex_databases::SQLiteFavoritesStore;
use pokedex_tui::TuiRunner;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Log to stdout, filtered by `RUST_LOG`
pub fn init_server_logging() {
    // Ignore a second initialisation (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init();
}

/// Log to a daily file under `log_dir` so that output does not draw over
/// the terminal UI. Keep the guard alive for the life of the program.
pub fn init_client_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(log_dir, "pokedex-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(writer)
        .try_init();
    Ok(guard)
}

/// Open the favorites database and the PokeAPI adapter and build the server
pub async fn build_server(config: &PokedexConfig) -> Result<ApiServer> {
    let data_source = PokeApiClient::new(&config.pokeapi)
        .context("Failed to create PokeAPI client")?;
    info!("Using PokeAPI at {}", data_source.base_url());

    let store = SQLiteFavoritesStore::open(&config.database.path)
        .await
        .with_context(|| {
            format!(
                "Failed to open favorites database {}",
                config.database.path.display()
            )
        })?;
    info!("Favorites database: {}", store.database_path());

    Ok(ApiServer::new(config, Arc::new(data_source), Arc::new(store)))
}

/// Run the API server until a shutdown signal arrives
pub async fn serve(config: &PokedexConfig) -> Result<()> {
    let server = build_server(config).await?;
    server.start().await
}

/// Run the terminal front end against the configured API
pub async fn browse(config: &PokedexConfig) -> Result<()> {
    let (client, notifications) =
        PokedexClient::connect(config.client.clone()).context("Failed to create API client")?;
    info!("Browsing {}", config.client.api_base_url);

    TuiRunner::new(client, notifications).run().await
}
