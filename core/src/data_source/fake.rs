//! Fake data source for testing
//!
//! Serves fixture records from memory instead of calling PokeAPI.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use super::{DataSourceError, PokemonDataSource};
use crate::models::{
    ArtworkSprites, EvolutionChain, NamedResource, OtherSprites, Pokemon, PokemonAbility,
    PokemonListPage, PokemonSpecies, PokemonSprites, PokemonType, ResourceLink,
};

const SPRITE_BASE: &str = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";
const API_BASE: &str = "https://pokeapi.co/api/v2";

/// In-memory [`PokemonDataSource`]
#[derive(Debug, Clone, Default)]
pub struct FakeDataSource {
    /// Records served by `list` and `detail`, kept sorted by id
    pokemon: Vec<Pokemon>,
    /// Evolution chain URL per species name
    species_chains: HashMap<String, String>,
    /// Chains by URL
    chains: HashMap<String, EvolutionChain>,
    /// Names whose detail lookup fails with a 500
    failing_details: HashSet<String>,
    /// Evolution lookups fail with a 500 when set
    failing_evolutions: bool,
    /// Every call fails with this network error when set
    error_message: Option<String>,
}

impl FakeDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fixture record with a type, an ability and both sprites
    pub fn sample_pokemon(id: u32, name: &str) -> Pokemon {
        Pokemon {
            id,
            name: name.to_string(),
            abilities: vec![PokemonAbility {
                ability: NamedResource::new("overgrow", format!("{API_BASE}/ability/65/")),
                is_hidden: false,
                slot: 1,
            }],
            types: vec![PokemonType {
                slot: 1,
                kind: NamedResource::new("normal", format!("{API_BASE}/type/1/")),
            }],
            sprites: PokemonSprites {
                front_default: Some(format!("{SPRITE_BASE}/{id}.png")),
                other: Some(OtherSprites {
                    official_artwork: Some(ArtworkSprites {
                        front_default: Some(format!(
                            "{SPRITE_BASE}/other/official-artwork/{id}.png"
                        )),
                    }),
                }),
            },
            height: 7,
            weight: 69,
        }
    }

    /// `count` sequential fixture records named `pokemon-<id>`
    pub fn with_generated(mut self, count: u32) -> Self {
        for id in 1..=count {
            self = self.with_pokemon(Self::sample_pokemon(id, &format!("pokemon-{id}")));
        }
        self
    }

    pub fn with_pokemon(mut self, pokemon: Pokemon) -> Self {
        self.pokemon.retain(|p| p.id != pokemon.id);
        self.pokemon.push(pokemon);
        self.pokemon.sort_by_key(|p| p.id);
        self
    }

    /// Register a chain and point every species in it at the chain
    pub fn with_evolution_chain(mut self, chain: EvolutionChain) -> Self {
        let url = format!("{API_BASE}/evolution-chain/{}/", chain.id);
        for name in crate::evolution::extract_evolutions(&chain) {
            self.species_chains.insert(name, url.clone());
        }
        self.chains.insert(url, chain);
        self
    }

    pub fn with_failing_detail(mut self, name: &str) -> Self {
        self.failing_details.insert(name.to_string());
        self
    }

    pub fn with_failing_evolutions(mut self) -> Self {
        self.failing_evolutions = true;
        self
    }

    /// Make every call fail with a network error
    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = Some(message.to_string());
        self
    }

    fn check_error(&self, url: &str) -> Result<(), DataSourceError> {
        match &self.error_message {
            Some(message) => Err(DataSourceError::Network {
                url: url.to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn find(&self, id_or_name: &str) -> Option<&Pokemon> {
        match id_or_name.parse::<u32>() {
            Ok(id) => self.pokemon.iter().find(|p| p.id == id),
            Err(_) => self.pokemon.iter().find(|p| p.name == id_or_name),
        }
    }
}

#[async_trait]
impl PokemonDataSource for FakeDataSource {
    async fn list(&self, limit: u32, offset: u32) -> Result<PokemonListPage, DataSourceError> {
        let url = format!("{API_BASE}/pokemon?limit={limit}&offset={offset}");
        self.check_error(&url)?;

        let total = self.pokemon.len() as u32;
        let results = self
            .pokemon
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|p| NamedResource::new(p.name.clone(), format!("{API_BASE}/pokemon/{}/", p.id)))
            .collect();

        let next = (offset.saturating_add(limit) < total).then(|| {
            format!(
                "{API_BASE}/pokemon?offset={}&limit={limit}",
                offset + limit
            )
        });
        let previous = (offset > 0).then(|| {
            format!(
                "{API_BASE}/pokemon?offset={}&limit={limit}",
                offset.saturating_sub(limit)
            )
        });

        Ok(PokemonListPage {
            count: total,
            next,
            previous,
            results,
        })
    }

    async fn detail(&self, id_or_name: &str) -> Result<Pokemon, DataSourceError> {
        let url = format!("{API_BASE}/pokemon/{id_or_name}");
        self.check_error(&url)?;

        let pokemon = self
            .find(id_or_name)
            .ok_or_else(|| DataSourceError::NotFound(url.clone()))?;
        if self.failing_details.contains(&pokemon.name) {
            return Err(DataSourceError::Status { status: 500, url });
        }
        Ok(pokemon.clone())
    }

    async fn species(&self, id_or_name: &str) -> Result<PokemonSpecies, DataSourceError> {
        let url = format!("{API_BASE}/pokemon-species/{id_or_name}");
        self.check_error(&url)?;
        if self.failing_evolutions {
            return Err(DataSourceError::Status { status: 500, url });
        }

        let pokemon = self
            .find(id_or_name)
            .ok_or_else(|| DataSourceError::NotFound(url.clone()))?;
        Ok(PokemonSpecies {
            evolution_chain: self
                .species_chains
                .get(&pokemon.name)
                .map(|url| ResourceLink { url: url.clone() }),
        })
    }

    async fn evolution_chain(&self, url: &str) -> Result<EvolutionChain, DataSourceError> {
        self.check_error(url)?;
        self.chains
            .get(url)
            .cloned()
            .ok_or_else(|| DataSourceError::NotFound(url.to_string()))
    }
}
