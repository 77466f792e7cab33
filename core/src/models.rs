//! Data Model
//!
//! Types for the records served by the third-party Pokémon data source and
//! for the favorites owned by this system. Field names on the external types
//! follow the upstream JSON so they pass through unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named reference to another upstream resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

impl NamedResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// An ability a Pokémon can have
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonAbility {
    pub ability: NamedResource,
    pub is_hidden: bool,
    pub slot: u8,
}

/// One of a Pokémon's types, ordered by slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonType {
    pub slot: u8,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkSprites {
    #[serde(default)]
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherSprites {
    #[serde(
        rename = "official-artwork",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub official_artwork: Option<ArtworkSprites>,
}

/// Sprite set: a default image plus optional high-resolution artwork
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonSprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<OtherSprites>,
}

impl PokemonSprites {
    /// Official artwork URL, if the source provided a non-empty one
    pub fn artwork(&self) -> Option<&str> {
        self.other
            .as_ref()
            .and_then(|other| other.official_artwork.as_ref())
            .and_then(|artwork| artwork.front_default.as_deref())
            .filter(|url| !url.is_empty())
    }

    /// Default sprite URL, if the source provided a non-empty one
    pub fn default_sprite(&self) -> Option<&str> {
        self.front_default.as_deref().filter(|url| !url.is_empty())
    }
}

/// A Pokémon record as served by the data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub abilities: Vec<PokemonAbility>,
    #[serde(default)]
    pub types: Vec<PokemonType>,
    #[serde(default)]
    pub sprites: PokemonSprites,
    /// Height in decimeters
    #[serde(default)]
    pub height: u32,
    /// Weight in hectograms
    #[serde(default)]
    pub weight: u32,
}

impl Pokemon {
    /// Whether either the artwork or the default sprite is usable
    pub fn has_usable_sprite(&self) -> bool {
        self.sprites.artwork().is_some() || self.sprites.default_sprite().is_some()
    }

    /// Replace a missing default sprite with an empty string when no usable
    /// sprite exists at all
    pub fn apply_sprite_fallback(&mut self) {
        if !self.has_usable_sprite() {
            self.sprites.front_default = Some(String::new());
        }
    }

    /// Artwork first, then the default sprite, then an empty string
    pub fn preferred_sprite(&self) -> &str {
        self.sprites
            .artwork()
            .or_else(|| self.sprites.default_sprite())
            .unwrap_or("")
    }

    /// Type names in slot order
    pub fn type_names(&self) -> Vec<&str> {
        let mut types: Vec<&PokemonType> = self.types.iter().collect();
        types.sort_by_key(|t| t.slot);
        types.into_iter().map(|t| t.kind.name.as_str()).collect()
    }
}

/// One page of the upstream Pokémon index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonListPage {
    pub count: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<NamedResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub url: String,
}

/// Species record; only the evolution chain reference is used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonSpecies {
    #[serde(default)]
    pub evolution_chain: Option<ResourceLink>,
}

/// What triggers an evolution step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionDetail {
    #[serde(default)]
    pub min_level: Option<u32>,
    pub trigger: NamedResource,
    #[serde(default)]
    pub item: Option<NamedResource>,
}

/// A node of the evolution tree. Children are owned by their parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolution_details: Vec<EvolutionDetail>,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

impl ChainLink {
    /// Leaf node for the given species name
    pub fn leaf(name: impl Into<String>) -> Self {
        let name = name.into();
        let url = format!("https://pokeapi.co/api/v2/pokemon-species/{name}/");
        Self {
            species: NamedResource::new(name, url),
            evolution_details: Vec::new(),
            evolves_to: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ChainLink>) -> Self {
        self.evolves_to = children;
        self
    }
}

/// Evolution chain resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionChain {
    pub id: u32,
    pub chain: ChainLink,
}

/// A persisted favorite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub pokemon_id: u32,
    pub pokemon_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon_sprite: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// A favorite that passed validation and is ready to be stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFavorite {
    pub pokemon_id: u32,
    pub pokemon_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon_sprite: Option<String>,
}

impl NewFavorite {
    /// Build the add-favorite request for a Pokémon, using its preferred sprite
    pub fn from_pokemon(pokemon: &Pokemon) -> Self {
        let sprite = pokemon.preferred_sprite();
        Self {
            pokemon_id: pokemon.id,
            pokemon_name: pokemon.name.clone(),
            pokemon_sprite: (!sprite.is_empty()).then(|| sprite.to_string()),
        }
    }
}

/// Add-favorite request body as received. Fields stay untyped so that shape
/// errors can be reported with readable reasons.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritePayload {
    #[serde(default)]
    pub pokemon_id: Option<Value>,
    #[serde(default)]
    pub pokemon_name: Option<Value>,
    #[serde(default)]
    pub pokemon_sprite: Option<Value>,
}
