//! Configuration Management Module
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `POKEDEX__SECTION__KEY` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "pokedex";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PokedexConfig {
    pub server: ServerSettings,
    pub pokeapi: PokeApiSettings,
    pub limits: ValidationLimits,
    pub rate_limit: RateLimitSettings,
    pub database: DatabaseSettings,
    pub client: ClientSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Maximum accepted JSON body size
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            body_limit_bytes: 10 * 1024,
        }
    }
}

/// Third-party Pokémon data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PokeApiSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for PokeApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://pokeapi.co/api/v2".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl PokeApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Bounds enforced by the request validators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    pub default_limit: u32,
    pub default_offset: u32,
    pub min_limit: u32,
    pub max_limit: u32,
    pub min_pokemon_id: u32,
    pub max_pokemon_id: u32,
    pub max_name_length: usize,
    pub sprite_allowed_domains: Vec<String>,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            default_offset: 0,
            min_limit: 1,
            max_limit: 100,
            min_pokemon_id: 1,
            max_pokemon_id: 1025,
            max_name_length: 50,
            sprite_allowed_domains: vec![
                "raw.githubusercontent.com".to_string(),
                "pokeapi.co".to_string(),
            ],
        }
    }
}

/// Per-IP request cap over a fixed window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window_seconds: u64,
    pub message: String,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window_seconds: 60 * 60,
            message: "Too many requests from this IP, please try again in an hour".to_string(),
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("pokedex.db"),
        }
    }
}

/// Settings for the terminal front end and its data layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub timeout_seconds: u64,
    pub items_per_page: u32,
    /// Ceiling for infinite scrolling and for client-side id checks
    pub max_pokemon: u32,
    pub stale_time_seconds: u64,
    pub log_dir: PathBuf,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1/".to_string(),
            timeout_seconds: 30,
            items_per_page: 20,
            max_pokemon: 150,
            stale_time_seconds: 5 * 60,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_seconds)
    }
}

impl PokedexConfig {
    /// Load configuration. An explicit path must exist; otherwise
    /// `pokedex.toml` in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                File::from(path).required(true)
            }
            None => {
                debug!("Looking for optional {DEFAULT_CONFIG_FILE}.toml");
                File::with_name(DEFAULT_CONFIG_FILE).required(false)
            }
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("POKEDEX")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("limits.sprite_allowed_domains"),
            )
            .build()?;

        let parsed: PokedexConfig = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject settings the validators and the limiter cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.min_limit == 0 || limits.min_limit > limits.max_limit {
            return Err(ConfigError::Message(format!(
                "limits.min_limit ({}) must be between 1 and limits.max_limit ({})",
                limits.min_limit, limits.max_limit
            )));
        }
        if limits.default_limit < limits.min_limit || limits.default_limit > limits.max_limit {
            return Err(ConfigError::Message(format!(
                "limits.default_limit ({}) must be between {} and {}",
                limits.default_limit, limits.min_limit, limits.max_limit
            )));
        }
        if limits.min_pokemon_id == 0 || limits.min_pokemon_id > limits.max_pokemon_id {
            return Err(ConfigError::Message(format!(
                "limits.min_pokemon_id ({}) must be between 1 and limits.max_pokemon_id ({})",
                limits.min_pokemon_id, limits.max_pokemon_id
            )));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::Message(
                "rate_limit.max_requests and rate_limit.window_seconds must be positive"
                    .to_string(),
            ));
        }
        if self.client.items_per_page == 0 {
            return Err(ConfigError::Message(
                "client.items_per_page must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
