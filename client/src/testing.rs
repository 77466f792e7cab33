//! In-memory backend for tests
//!
//! Pokémon reads are served from a [`FakeDataSource`]; favorites live in a
//! vector. Reads and mutations can be switched to fail independently.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use pokedex_core::{
    extract_evolutions, DataSourceError, FakeDataSource, Favorite, NewFavorite, Pokemon,
    PokemonDataSource, PokemonDetailData,
};

use crate::backend::PokedexBackend;
use crate::error::ClientError;

#[derive(Default)]
struct Flags {
    fail_reads: AtomicBool,
    fail_mutations: AtomicBool,
    list_calls: AtomicUsize,
}

/// [`PokedexBackend`] double with switchable failures
#[derive(Clone)]
pub struct MemoryBackend {
    source: Arc<FakeDataSource>,
    favorites: Arc<Mutex<Vec<Favorite>>>,
    flags: Arc<Flags>,
}

impl MemoryBackend {
    pub fn new(source: FakeDataSource) -> Self {
        Self {
            source: Arc::new(source),
            favorites: Arc::new(Mutex::new(Vec::new())),
            flags: Arc::new(Flags::default()),
        }
    }

    /// Backed by `count` generated Pokémon
    pub fn with_generated(count: u32) -> Self {
        Self::new(FakeDataSource::new().with_generated(count))
    }

    pub fn fail_reads(&self, fail: bool) {
        self.flags.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.flags.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Number of list requests served so far
    pub fn list_calls(&self) -> usize {
        self.flags.list_calls.load(Ordering::SeqCst)
    }

    /// Stored favorite ids, newest first
    pub fn favorite_ids(&self) -> Vec<u32> {
        self.lock().iter().map(|f| f.pokemon_id).collect()
    }

    /// Store a favorite directly, bypassing the failure switches
    pub fn seed_favorite(&self, pokemon_id: u32) {
        self.lock().insert(
            0,
            Favorite {
                pokemon_id,
                pokemon_name: format!("pokemon-{pokemon_id}"),
                pokemon_sprite: None,
                added_at: Utc::now(),
            },
        );
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Favorite>> {
        self.favorites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reads(&self) -> Result<(), ClientError> {
        if self.flags.fail_reads.load(Ordering::SeqCst) {
            return Err(ClientError::NoResponse);
        }
        Ok(())
    }

    fn check_mutations(&self) -> Result<(), ClientError> {
        if self.flags.fail_mutations.load(Ordering::SeqCst) {
            return Err(ClientError::NoResponse);
        }
        Ok(())
    }
}

fn api_error(err: DataSourceError, not_found: &str) -> ClientError {
    if err.is_not_found() {
        ClientError::Api {
            status: 404,
            message: not_found.to_string(),
        }
    } else {
        ClientError::Api {
            status: 500,
            message: "Failed to fetch Pokemon data".to_string(),
        }
    }
}

#[async_trait]
impl PokedexBackend for MemoryBackend {
    async fn list_pokemon(&self, limit: u32, offset: u32) -> Result<Vec<Pokemon>, ClientError> {
        self.flags.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;

        let page = self
            .source
            .list(limit, offset)
            .await
            .map_err(|e| api_error(e, "No Pokemon found"))?;

        let mut pokemon = Vec::with_capacity(page.results.len());
        for entry in &page.results {
            let detail = self
                .source
                .detail(&entry.name)
                .await
                .map_err(|e| api_error(e, "No Pokemon found"))?;
            pokemon.push(detail);
        }
        Ok(pokemon)
    }

    async fn get_pokemon(&self, id_or_name: &str) -> Result<PokemonDetailData, ClientError> {
        self.check_reads()?;
        let pokemon = self
            .source
            .detail(id_or_name)
            .await
            .map_err(|e| api_error(e, "No Pokemon found with that ID or name"))?;
        // Best effort, like the server
        let evolutions = match self.source.species(&pokemon.name).await {
            Ok(species) => match species.evolution_chain {
                Some(link) => self
                    .source
                    .evolution_chain(&link.url)
                    .await
                    .map(|chain| extract_evolutions(&chain))
                    .unwrap_or_default(),
                None => Vec::new(),
            },
            Err(_) => Vec::new(),
        };
        Ok(PokemonDetailData {
            pokemon,
            evolutions,
        })
    }

    async fn search_pokemon(&self, name: &str) -> Result<Pokemon, ClientError> {
        self.check_reads()?;
        self.source
            .detail(name)
            .await
            .map_err(|e| api_error(e, "No Pokemon found with that name"))
    }

    async fn list_favorites(&self) -> Result<Vec<Favorite>, ClientError> {
        self.check_reads()?;
        Ok(self.lock().clone())
    }

    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<Favorite, ClientError> {
        self.check_mutations()?;
        let mut favorites = self.lock();
        if favorites.iter().any(|f| f.pokemon_id == favorite.pokemon_id) {
            return Err(ClientError::Api {
                status: 409,
                message: "This Pokemon is already in favorites".to_string(),
            });
        }

        let stored = Favorite {
            pokemon_id: favorite.pokemon_id,
            pokemon_name: favorite.pokemon_name.to_lowercase(),
            pokemon_sprite: favorite.pokemon_sprite.clone(),
            added_at: Utc::now(),
        };
        favorites.insert(0, stored.clone());
        Ok(stored)
    }

    async fn remove_favorite(&self, pokemon_id: u32) -> Result<(), ClientError> {
        self.check_mutations()?;
        let mut favorites = self.lock();
        let before = favorites.len();
        favorites.retain(|f| f.pokemon_id != pokemon_id);
        if favorites.len() == before {
            return Err(ClientError::Api {
                status: 404,
                message: "No favorite found with that Pokemon ID".to_string(),
            });
        }
        Ok(())
    }

    async fn clear_favorites(&self) -> Result<(), ClientError> {
        self.check_mutations()?;
        self.lock().clear();
        Ok(())
    }

    async fn check_favorite(&self, pokemon_id: u32) -> Result<bool, ClientError> {
        self.check_reads()?;
        Ok(self.lock().iter().any(|f| f.pokemon_id == pokemon_id))
    }
}
