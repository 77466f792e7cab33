//! Pokémon handlers
//!
//! Reads are proxied to the data source on every request; nothing is cached
//! or stored on this side.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use pokedex_core::validation::{validate_identifier, validate_pagination, validate_search_name};
use pokedex_core::{
    extract_evolutions, DataSourceError, Envelope, PokemonData, PokemonDataSource,
    PokemonDetailData, PokemonListData,
};

use super::ApiState;
use crate::error::AppError;

const FETCH_FAILED: &str = "Failed to fetch Pokemon data";

/// List Pokémon with full details for each entry
pub async fn list_pokemon(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Envelope<PokemonListData>>, AppError> {
    let page = validate_pagination(
        params.get("limit").map(String::as_str),
        params.get("offset").map(String::as_str),
        &state.limits,
    )?;
    debug!("Listing Pokemon: limit={} offset={}", page.limit, page.offset);

    let listing = state
        .data_source
        .list(page.limit, page.offset)
        .await
        .map_err(|e| AppError::from_data_source(e, "No Pokemon found", FETCH_FAILED))?;

    // One failed detail fails the whole page
    let pokemon = try_join_all(
        listing
            .results
            .iter()
            .map(|entry| state.data_source.detail(&entry.name)),
    )
    .await
    .map_err(|e| AppError::from_data_source(e, "No Pokemon found", FETCH_FAILED))?;

    let results = pokemon.len();
    Ok(Json(
        Envelope::success(PokemonListData { pokemon }).with_results(results),
    ))
}

/// Get one Pokémon by id or name, with best-effort evolutions
pub async fn get_pokemon(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<PokemonDetailData>>, AppError> {
    let identifier = validate_identifier(&id, &state.limits)?;
    debug!("Getting Pokemon: {identifier}");

    let mut pokemon = state
        .data_source
        .detail(&identifier.to_string())
        .await
        .map_err(|e| {
            AppError::from_data_source(e, "No Pokemon found with that ID or name", FETCH_FAILED)
        })?;

    pokemon.apply_sprite_fallback();

    let evolutions = fetch_evolutions(state.data_source.as_ref(), pokemon.id).await;

    Ok(Json(Envelope::success(PokemonDetailData {
        pokemon,
        evolutions,
    })))
}

/// Species, then chain, then flatten. Evolution data is supplementary, so
/// any failure yields an empty list.
async fn fetch_evolutions(source: &dyn PokemonDataSource, pokemon_id: u32) -> Vec<String> {
    let key = pokemon_id.to_string();
    let result: Result<Vec<String>, DataSourceError> = async {
        let species = source.species(&key).await?;
        match species.evolution_chain {
            Some(link) => {
                let chain = source.evolution_chain(&link.url).await?;
                Ok(extract_evolutions(&chain))
            }
            None => Ok(Vec::new()),
        }
    }
    .await;

    result.unwrap_or_else(|e| {
        debug!("Evolution chain not available for Pokemon {pokemon_id}: {e}");
        Vec::new()
    })
}

/// Search a Pokémon by exact name
pub async fn search_pokemon(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> Result<Json<Envelope<PokemonData>>, AppError> {
    let name = validate_search_name(&name, &state.limits)?;
    debug!("Searching Pokemon: {name}");

    let pokemon = state.data_source.detail(&name).await.map_err(|e| match e {
        DataSourceError::Malformed { .. } => {
            AppError::Server("Invalid Pokemon data received".to_string())
        }
        other => AppError::from_data_source(other, "No Pokemon found with that name", FETCH_FAILED),
    })?;

    if pokemon.id == 0 || pokemon.name.is_empty() {
        return Err(AppError::Server("Invalid Pokemon data received".to_string()));
    }

    Ok(Json(Envelope::success(PokemonData { pokemon })))
}
