//! API Handlers Module
//!
//! This module contains the request handlers for the API system.

use axum::{extract::OriginalUri, response::Json};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use pokedex_core::{PokemonDataSource, ValidationLimits};
use pokedex_databases::FavoritesStore;

use crate::error::AppError;

pub mod favorites;
pub mod pokemon;

pub use favorites::{
    add_favorite, check_favorite, clear_favorites, list_favorites, remove_favorite,
    verify_favorite_target, VerifiedFavorite,
};
pub use pokemon::{get_pokemon, list_pokemon, search_pokemon};

/// Represents the state of the API server
pub struct ApiState {
    /// Third-party Pokémon data
    pub data_source: Arc<dyn PokemonDataSource>,
    /// Favorites persistence
    pub favorites: Arc<dyn FavoritesStore>,
    /// Validator bounds
    pub limits: ValidationLimits,
}

/// Health check endpoint
pub async fn health_check() -> Json<HashMap<String, String>> {
    let mut response = HashMap::new();
    response.insert("status".to_string(), "success".to_string());
    response.insert("message".to_string(), "Pokémon API is running!".to_string());
    response.insert("timestamp".to_string(), chrono::Utc::now().to_rfc3339());
    Json(response)
}

/// Version and endpoint listing
pub async fn api_index() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Welcome to Pokémon API",
        "version": "1.0.0",
        "endpoints": {
            "pokemon": {
                "getAll": "GET /api/v1/pokemon",
                "getOne": "GET /api/v1/pokemon/:id",
                "search": "GET /api/v1/pokemon/search/:name",
            },
            "favorites": {
                "getAll": "GET /api/v1/favorites",
                "add": "POST /api/v1/favorites",
                "remove": "DELETE /api/v1/favorites/:pokemonId",
                "clear": "DELETE /api/v1/favorites/clear",
                "check": "GET /api/v1/favorites/check/:pokemonId",
            },
        },
    }))
}

/// Fallback for unmatched routes
pub async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(format!("Can't find {uri} on this server"))
}
