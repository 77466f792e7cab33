//! External Pokémon Data Source
//!
//! The backend never stores Pokémon data; every read goes through a
//! [`PokemonDataSource`]. Calls are not retried: a failure surfaces to the
//! caller, which decides whether it is fatal or best-effort.

use async_trait::async_trait;

use crate::models::{EvolutionChain, Pokemon, PokemonListPage, PokemonSpecies};

pub mod fake;
pub mod pokeapi;

pub use fake::FakeDataSource;
pub use pokeapi::PokeApiClient;

/// Data source errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataSourceError {
    /// The source answered 404
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("Upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Connection refused, timeout, etc.
    #[error("Network error calling {url}: {message}")]
    Network { url: String, message: String },

    /// Body could not be decoded into the expected shape
    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
}

impl DataSourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataSourceError::NotFound(_))
    }
}

/// Typed access to the third-party Pokémon API
#[async_trait]
pub trait PokemonDataSource: Send + Sync {
    /// One page of the Pokémon index
    async fn list(&self, limit: u32, offset: u32) -> Result<PokemonListPage, DataSourceError>;

    /// Full record by id or lowercase name
    async fn detail(&self, id_or_name: &str) -> Result<Pokemon, DataSourceError>;

    /// Species record, used to find the evolution chain
    async fn species(&self, id_or_name: &str) -> Result<PokemonSpecies, DataSourceError>;

    /// Evolution chain by the absolute URL found on the species
    async fn evolution_chain(&self, url: &str) -> Result<EvolutionChain, DataSourceError>;
}
