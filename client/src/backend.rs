//! Backend access
//!
//! [`PokedexBackend`] is the seam between the data layer and the HTTP API so
//! that caching, pagination and optimistic updates can be tested against an
//! in-memory double.

use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use pokedex_core::{
    ClientSettings, Envelope, ErrorEnvelope, Favorite, FavoriteData, FavoriteStatus,
    FavoritesData, NewFavorite, Pokemon, PokemonData, PokemonDetailData, PokemonListData,
};

use crate::error::ClientError;

/// Backend operations used by the front end
#[async_trait]
pub trait PokedexBackend: Send + Sync {
    async fn list_pokemon(&self, limit: u32, offset: u32) -> Result<Vec<Pokemon>, ClientError>;

    async fn get_pokemon(&self, id_or_name: &str) -> Result<PokemonDetailData, ClientError>;

    async fn search_pokemon(&self, name: &str) -> Result<Pokemon, ClientError>;

    async fn list_favorites(&self) -> Result<Vec<Favorite>, ClientError>;

    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<Favorite, ClientError>;

    async fn remove_favorite(&self, pokemon_id: u32) -> Result<(), ClientError>;

    async fn clear_favorites(&self) -> Result<(), ClientError>;

    async fn check_favorite(&self, pokemon_id: u32) -> Result<bool, ClientError>;
}

/// [`PokedexBackend`] over the versioned HTTP API
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    /// Always ends with `/`
    base_url: String,
}

impl HttpBackend {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ClientError::Invalid(format!("Failed to build HTTP client: {e}")))?;

        let mut base_url = settings.api_base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&NewFavorite>,
    ) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{method} {url}");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            debug!("Request to {url} failed: {e}");
            ClientError::NoResponse
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let message = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => envelope.message,
            Err(_) => format!("Request failed with status code {status}"),
        };
        Err(ClientError::Api { status, message })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&NewFavorite>,
    ) -> Result<Envelope<T>, ClientError> {
        let response = self.send(method, path, body).await?;
        response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PokedexBackend for HttpBackend {
    async fn list_pokemon(&self, limit: u32, offset: u32) -> Result<Vec<Pokemon>, ClientError> {
        let envelope: Envelope<PokemonListData> = self
            .call(
                Method::GET,
                &format!("pokemon?limit={limit}&offset={offset}"),
                None,
            )
            .await?;
        Ok(envelope.data.pokemon)
    }

    async fn get_pokemon(&self, id_or_name: &str) -> Result<PokemonDetailData, ClientError> {
        let envelope: Envelope<PokemonDetailData> = self
            .call(Method::GET, &format!("pokemon/{id_or_name}"), None)
            .await?;
        Ok(envelope.data)
    }

    async fn search_pokemon(&self, name: &str) -> Result<Pokemon, ClientError> {
        let envelope: Envelope<PokemonData> = self
            .call(Method::GET, &format!("pokemon/search/{name}"), None)
            .await?;
        Ok(envelope.data.pokemon)
    }

    async fn list_favorites(&self) -> Result<Vec<Favorite>, ClientError> {
        let envelope: Envelope<FavoritesData> =
            self.call(Method::GET, "favorites", None).await?;
        Ok(envelope.data.favorites)
    }

    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<Favorite, ClientError> {
        let envelope: Envelope<FavoriteData> = self
            .call(Method::POST, "favorites", Some(favorite))
            .await?;
        Ok(envelope.data.favorite)
    }

    async fn remove_favorite(&self, pokemon_id: u32) -> Result<(), ClientError> {
        self.send(Method::DELETE, &format!("favorites/{pokemon_id}"), None)
            .await?;
        Ok(())
    }

    async fn clear_favorites(&self) -> Result<(), ClientError> {
        self.send(Method::DELETE, "favorites/clear", None).await?;
        Ok(())
    }

    async fn check_favorite(&self, pokemon_id: u32) -> Result<bool, ClientError> {
        let envelope: Envelope<FavoriteStatus> = self
            .call(Method::GET, &format!("favorites/check/{pokemon_id}"), None)
            .await?;
        Ok(envelope.data.is_favorite)
    }
}
