//! Pokedex Core Module
//!
//! The core module holds everything the backend and the client share: the
//! Pokémon and favorite data model, the response envelope, request
//! validation, evolution chain extraction, configuration, and the adapter
//! over the third-party Pokémon data source.

pub mod config;
pub mod data_source;
pub mod envelope;
pub mod evolution;
pub mod models;
pub mod validation;

pub use config::{
    ClientSettings, DatabaseSettings, PokeApiSettings, PokedexConfig, RateLimitSettings,
    ServerSettings, ValidationLimits,
};
pub use data_source::{DataSourceError, FakeDataSource, PokeApiClient, PokemonDataSource};
pub use envelope::{
    Envelope, ErrorEnvelope, FavoriteData, FavoriteStatus, FavoritesData, PokemonData,
    PokemonDetailData, PokemonListData,
};
pub use evolution::extract_evolutions;
pub use models::{
    ChainLink, EvolutionChain, EvolutionDetail, Favorite, FavoritePayload, NamedResource,
    NewFavorite, Pokemon, PokemonAbility, PokemonListPage, PokemonSpecies, PokemonSprites,
    PokemonType,
};
pub use validation::{Pagination, PokemonIdentifier, ValidationError};
