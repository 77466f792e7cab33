//! Pokedex Databases Module
//!
//! Persistence boundary for favorites. The only operations are list, find,
//! insert, delete-one and delete-all; a favorite is never updated in place.

use async_trait::async_trait;
use pokedex_core::{Favorite, NewFavorite};

pub mod sqlite;

pub use sqlite::SQLiteFavoritesStore;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A favorite with this Pokémon id already exists
    #[error("Favorite for Pokemon {0} already exists")]
    Conflict(u32),

    /// No favorite with this Pokémon id
    #[error("No favorite found for Pokemon {0}")]
    NotFound(u32),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to acquire connection lock: {0}")]
    Lock(String),
}

/// Favorite persistence
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// All favorites, newest first
    async fn list(&self) -> Result<Vec<Favorite>, StoreError>;

    async fn find_by_pokemon_id(&self, pokemon_id: u32) -> Result<Option<Favorite>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the Pokémon id is already stored
    async fn insert(&self, favorite: NewFavorite) -> Result<Favorite, StoreError>;

    /// Fails with [`StoreError::NotFound`] if nothing matched
    async fn delete_by_pokemon_id(&self, pokemon_id: u32) -> Result<Favorite, StoreError>;

    /// Remove everything; returns how many records were removed
    async fn delete_all(&self) -> Result<usize, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}
