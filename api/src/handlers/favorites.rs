//! Favorites handlers

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::{debug, info};

use pokedex_core::validation::{parse_favorite_payload, validate_pokemon_id, validate_sprite_url};
use pokedex_core::{
    Envelope, FavoriteData, FavoritePayload, FavoriteStatus, FavoritesData, NewFavorite, Pokemon,
    ValidationError,
};

use super::ApiState;
use crate::error::AppError;

/// An add-favorite request whose target was checked against the live
/// Pokémon record
#[derive(Debug, Clone)]
pub struct VerifiedFavorite {
    pub favorite: NewFavorite,
    pub pokemon: Pokemon,
}

#[async_trait]
impl FromRequest<Arc<ApiState>> for VerifiedFavorite {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &Arc<ApiState>) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<FavoritePayload>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                AppError::Validation(ValidationError::new(rejection.body_text()))
            })?;

        verify_favorite_target(state, payload).await
    }
}

/// Check the payload shape, confirm that the Pokémon exists and that the
/// supplied name belongs to it, then check the sprite URL
pub async fn verify_favorite_target(
    state: &ApiState,
    payload: FavoritePayload,
) -> Result<VerifiedFavorite, AppError> {
    let favorite = parse_favorite_payload(&payload)?;

    if favorite.pokemon_id < state.limits.min_pokemon_id
        || favorite.pokemon_id > state.limits.max_pokemon_id
    {
        return Err(ValidationError::new("Pokemon ID out of range").into());
    }

    let pokemon = state
        .data_source
        .detail(&favorite.pokemon_id.to_string())
        .await
        .map_err(|e| {
            AppError::from_data_source(
                e,
                "Pokemon does not exist",
                "Failed to verify Pokemon existence",
            )
        })?;

    if !pokemon.name.eq_ignore_ascii_case(&favorite.pokemon_name) {
        return Err(ValidationError::new("Pokemon ID and name do not match").into());
    }

    if let Some(sprite) = &favorite.pokemon_sprite {
        validate_sprite_url(sprite, &state.limits)?;
    }

    debug!("Verified favorite target {} ({})", pokemon.name, pokemon.id);
    Ok(VerifiedFavorite { favorite, pokemon })
}

pub async fn list_favorites(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Envelope<FavoritesData>>, AppError> {
    let favorites = state.favorites.list().await?;
    let results = favorites.len();
    Ok(Json(
        Envelope::success(FavoritesData { favorites }).with_results(results),
    ))
}

pub async fn add_favorite(
    State(state): State<Arc<ApiState>>,
    verified: VerifiedFavorite,
) -> Result<(StatusCode, Json<Envelope<FavoriteData>>), AppError> {
    let VerifiedFavorite {
        mut favorite,
        pokemon,
    } = verified;
    let pokemon_id = favorite.pokemon_id;
    if state.favorites.find_by_pokemon_id(pokemon_id).await?.is_some() {
        return Err(AppError::Conflict(
            "This Pokemon is already in favorites".to_string(),
        ));
    }

    // The UNIQUE constraint still rejects a concurrent insert of the same id
    // Store the live record's spelling of the name
    favorite.pokemon_name = pokemon.name;
    let favorite = state.favorites.insert(favorite).await?;
    info!("Added favorite {} ({})", favorite.pokemon_name, pokemon_id);

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(FavoriteData { favorite })),
    ))
}

pub async fn remove_favorite(
    State(state): State<Arc<ApiState>>,
    Path(pokemon_id): Path<String>,
) -> Result<Json<Envelope<()>>, AppError> {
    let pokemon_id = validate_pokemon_id(&pokemon_id, &state.limits)?;
    state.favorites.delete_by_pokemon_id(pokemon_id).await?;
    info!("Removed favorite {pokemon_id}");

    Ok(Json(
        Envelope::success(()).with_message("Favorite removed successfully"),
    ))
}

pub async fn clear_favorites(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Envelope<()>>, AppError> {
    let removed = state.favorites.delete_all().await?;
    info!("Cleared {removed} favorites");

    Ok(Json(
        Envelope::success(()).with_message("All favorites cleared successfully"),
    ))
}

pub async fn check_favorite(
    State(state): State<Arc<ApiState>>,
    Path(pokemon_id): Path<String>,
) -> Result<Json<Envelope<FavoriteStatus>>, AppError> {
    let pokemon_id = validate_pokemon_id(&pokemon_id, &state.limits)?;
    let is_favorite = state
        .favorites
        .find_by_pokemon_id(pokemon_id)
        .await?
        .is_some();

    Ok(Json(Envelope::success(FavoriteStatus { is_favorite })))
}
