//! PokeAPI client
//!
//! HTTP implementation of [`PokemonDataSource`] over reqwest.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{DataSourceError, PokemonDataSource};
use crate::config::PokeApiSettings;
use crate::models::{EvolutionChain, Pokemon, PokemonListPage, PokemonSpecies};

/// Client for `https://pokeapi.co/api/v2` (or a compatible base URL)
#[derive(Debug, Clone)]
pub struct PokeApiClient {
    http: Client,
    base_url: String,
}

impl PokeApiClient {
    pub fn new(settings: &PokeApiSettings) -> Result<Self, DataSourceError> {
        let http = Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("pokedex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataSourceError::Network {
                url: settings.base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DataSourceError> {
        debug!("GET {url}");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DataSourceError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DataSourceError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            warn!("PokeAPI returned {status} for {url}");
            return Err(DataSourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DataSourceError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        serde_json::from_slice(&body).map_err(|e| DataSourceError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl PokemonDataSource for PokeApiClient {
    async fn list(&self, limit: u32, offset: u32) -> Result<PokemonListPage, DataSourceError> {
        let url = self.endpoint(&format!("pokemon?limit={limit}&offset={offset}"));
        self.get_json(&url).await
    }

    async fn detail(&self, id_or_name: &str) -> Result<Pokemon, DataSourceError> {
        let url = self.endpoint(&format!("pokemon/{id_or_name}"));
        self.get_json(&url).await
    }

    async fn species(&self, id_or_name: &str) -> Result<PokemonSpecies, DataSourceError> {
        let url = self.endpoint(&format!("pokemon-species/{id_or_name}"));
        self.get_json(&url).await
    }

    async fn evolution_chain(&self, url: &str) -> Result<EvolutionChain, DataSourceError> {
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = PokeApiClient::new(&PokeApiSettings {
            base_url: "https://pokeapi.co/api/v2/".to_string(),
            timeout_seconds: 5,
        })
        .unwrap();
        assert_eq!(client.base_url(), "https://pokeapi.co/api/v2");
        assert_eq!(
            client.endpoint("pokemon/25"),
            "https://pokeapi.co/api/v2/pokemon/25"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = PokeApiClient::new(&PokeApiSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
        })
        .unwrap();

        let err = client.detail("pikachu").await.unwrap_err();
        assert!(matches!(err, DataSourceError::Network { .. }));
        assert!(!err.is_not_found());
    }
}
