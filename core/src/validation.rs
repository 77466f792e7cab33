//! Request Validators
//!
//! Pure checks run before any controller touches the data source or the
//! store. Each returns the parsed value or a [`ValidationError`] whose text
//! is shown to the caller as-is.

use regex::Regex;
use reqwest::Url;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

use crate::config::ValidationLimits;
use crate::models::{FavoritePayload, NewFavorite};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9-]+$").unwrap());

/// Malformed or out-of-range input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A Pokémon looked up either by numeric id or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PokemonIdentifier {
    Id(u32),
    Name(String),
}

impl fmt::Display for PokemonIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PokemonIdentifier::Id(id) => write!(f, "{id}"),
            PokemonIdentifier::Name(name) => f.write_str(name),
        }
    }
}

/// Validated list window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn id_range_error(limits: &ValidationLimits) -> ValidationError {
    ValidationError::new(format!(
        "Pokemon ID must be between {} and {}",
        limits.min_pokemon_id, limits.max_pokemon_id
    ))
}

fn parse_id_in_range(value: &str, limits: &ValidationLimits) -> Result<u32, ValidationError> {
    let id: u32 = value.parse().map_err(|_| id_range_error(limits))?;
    if id < limits.min_pokemon_id || id > limits.max_pokemon_id {
        return Err(id_range_error(limits));
    }
    Ok(id)
}

/// Letters, digits and hyphens only
pub fn matches_name_charset(value: &str) -> bool {
    NAME_PATTERN.is_match(value)
}

/// Validate an id-or-name path parameter. Names are lowercased.
pub fn validate_identifier(
    raw: &str,
    limits: &ValidationLimits,
) -> Result<PokemonIdentifier, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::new("Pokemon ID or name is required"));
    }

    if is_all_digits(value) {
        return parse_id_in_range(value, limits).map(PokemonIdentifier::Id);
    }

    if !NAME_PATTERN.is_match(value) {
        return Err(ValidationError::new(
            "Invalid Pokemon name format. Use only letters, numbers, and hyphens",
        ));
    }
    if value.len() > limits.max_name_length {
        return Err(ValidationError::new("Pokemon name too long"));
    }
    Ok(PokemonIdentifier::Name(value.to_lowercase()))
}

/// Validate a search term and return it lowercased
pub fn validate_search_name(raw: &str, limits: &ValidationLimits) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::new(
            "Please provide a Pokemon name to search",
        ));
    }
    if !NAME_PATTERN.is_match(value) {
        return Err(ValidationError::new(
            "Invalid Pokemon name format. Use only letters, numbers, and hyphens",
        ));
    }
    if value.len() > limits.max_name_length {
        return Err(ValidationError::new("Pokemon name too long"));
    }
    Ok(value.to_lowercase())
}

/// Validate a numeric Pokémon id path parameter
pub fn validate_pokemon_id(raw: &str, limits: &ValidationLimits) -> Result<u32, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::new("Pokemon ID is required"));
    }
    if !is_all_digits(value) {
        return Err(ValidationError::new("Invalid Pokemon ID format"));
    }
    parse_id_in_range(value, limits)
}

/// Validate the `limit`/`offset` query parameters, applying defaults for
/// absent ones
pub fn validate_pagination(
    limit: Option<&str>,
    offset: Option<&str>,
    limits: &ValidationLimits,
) -> Result<Pagination, ValidationError> {
    let limit_error = || {
        ValidationError::new(format!(
            "Limit must be between {} and {}",
            limits.min_limit, limits.max_limit
        ))
    };

    let limit = match limit.map(str::trim).filter(|v| !v.is_empty()) {
        None => limits.default_limit,
        Some(raw) => {
            let parsed: i64 = raw.parse().map_err(|_| limit_error())?;
            if parsed < i64::from(limits.min_limit) || parsed > i64::from(limits.max_limit) {
                return Err(limit_error());
            }
            parsed as u32
        }
    };

    let offset = match offset.map(str::trim).filter(|v| !v.is_empty()) {
        None => limits.default_offset,
        Some(raw) => {
            let parsed: i64 = raw
                .parse()
                .map_err(|_| ValidationError::new("Offset must be a non-negative integer"))?;
            if parsed < 0 {
                return Err(ValidationError::new("Offset must be non-negative"));
            }
            u32::try_from(parsed).map_err(|_| ValidationError::new("Offset is too large"))?
        }
    };

    Ok(Pagination { limit, offset })
}

/// A sprite must be an absolute URL on one of the trusted image hosts
pub fn validate_sprite_url(raw: &str, limits: &ValidationLimits) -> Result<(), ValidationError> {
    let url = Url::parse(raw).map_err(|_| ValidationError::new("Invalid sprite URL format"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::new("Invalid sprite URL format"));
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let allowed = limits
        .sprite_allowed_domains
        .iter()
        .any(|domain| domain.eq_ignore_ascii_case(&host));
    if !allowed {
        return Err(ValidationError::new("Sprite URL must be from PokeAPI"));
    }
    Ok(())
}

/// Check the shape of an add-favorite body and that any sprite is on a
/// trusted host
pub fn validate_favorite_payload(
    payload: &FavoritePayload,
    limits: &ValidationLimits,
) -> Result<NewFavorite, ValidationError> {
    let favorite = parse_favorite_payload(payload)?;
    if let Some(sprite) = &favorite.pokemon_sprite {
        validate_sprite_url(sprite, limits)?;
    }
    Ok(favorite)
}

/// Shape-only check of an add-favorite body: a positive integer id, a
/// non-empty name, and an optional sprite string. The sprite URL itself is
/// not inspected.
pub fn parse_favorite_payload(payload: &FavoritePayload) -> Result<NewFavorite, ValidationError> {
    let pokemon_id = match &payload.pokemon_id {
        None | Some(Value::Null) => return Err(ValidationError::new("Pokemon ID is required")),
        Some(Value::Number(number)) => match number.as_u64() {
            Some(id) if id > 0 => u32::try_from(id)
                .map_err(|_| ValidationError::new("Pokemon ID out of range"))?,
            _ => {
                return Err(ValidationError::new(
                    "Invalid Pokemon ID. Must be a positive integer",
                ))
            }
        },
        Some(Value::String(text)) if text.trim().parse::<f64>().is_ok() => {
            return Err(ValidationError::new(
                "Invalid Pokemon ID. Must be a positive integer",
            ))
        }
        Some(_) => return Err(ValidationError::new("Pokemon ID must be a number")),
    };

    let pokemon_name = match &payload.pokemon_name {
        None | Some(Value::Null) => return Err(ValidationError::new("Pokemon name is required")),
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(_) => return Err(ValidationError::new("Invalid Pokemon name format")),
    };

    let pokemon_sprite = match &payload.pokemon_sprite {
        None | Some(Value::Null) => None,
        Some(Value::String(sprite)) if sprite.is_empty() => None,
        Some(Value::String(sprite)) => Some(sprite.clone()),
        Some(_) => {
            return Err(ValidationError::new(
                "Pokemon sprite must be a valid URL string",
            ))
        }
    };

    Ok(NewFavorite {
        pokemon_id,
        pokemon_name,
        pokemon_sprite,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn limits() -> ValidationLimits {
        ValidationLimits::default()
    }

    fn payload(value: Value) -> FavoritePayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_identifier_numeric_range() {
        assert_eq!(
            validate_identifier("25", &limits()),
            Ok(PokemonIdentifier::Id(25))
        );
        assert_eq!(
            validate_identifier(" 1025 ", &limits()),
            Ok(PokemonIdentifier::Id(1025))
        );
        assert!(validate_identifier("0", &limits()).is_err());
        assert!(validate_identifier("1026", &limits()).is_err());
        assert!(validate_identifier("99999999999999999999", &limits()).is_err());
    }

    #[test]
    fn test_identifier_name_rules() {
        assert_eq!(
            validate_identifier("Mr-Mime", &limits()),
            Ok(PokemonIdentifier::Name("mr-mime".to_string()))
        );
        assert!(validate_identifier("   ", &limits()).is_err());
        assert!(validate_identifier("pika chu", &limits()).is_err());
        assert!(validate_identifier(&"a".repeat(51), &limits()).is_err());
    }

    #[test]
    fn test_search_name_charset_and_length() {
        assert!(validate_search_name("pikachu!!", &limits()).is_err());
        assert_eq!(
            validate_search_name("pikachu-2", &limits()),
            Ok("pikachu-2".to_string())
        );
        assert_eq!(
            validate_search_name("PIKACHU", &limits()),
            Ok("pikachu".to_string())
        );
        assert!(validate_search_name(&"p".repeat(50), &limits()).is_ok());
        let err = validate_search_name(&"p".repeat(51), &limits()).unwrap_err();
        assert_eq!(err.reason, "Pokemon name too long");
    }

    #[test]
    fn test_pagination_bounds() {
        assert!(validate_pagination(Some("0"), None, &limits()).is_err());
        assert!(validate_pagination(Some("101"), None, &limits()).is_err());
        assert_eq!(
            validate_pagination(Some("100"), None, &limits()),
            Ok(Pagination {
                limit: 100,
                offset: 0
            })
        );
        assert_eq!(
            validate_pagination(None, None, &limits()),
            Ok(Pagination {
                limit: 10,
                offset: 0
            })
        );
        assert!(validate_pagination(Some("abc"), None, &limits()).is_err());
        assert!(validate_pagination(None, Some("-1"), &limits()).is_err());
        assert_eq!(
            validate_pagination(Some("20"), Some("40"), &limits()).map(|p| p.offset),
            Ok(40)
        );
    }

    #[test]
    fn test_sprite_url_allow_list() {
        assert!(validate_sprite_url("not-a-url", &limits()).is_err());
        assert!(validate_sprite_url("https://evil.example.com/25.png", &limits()).is_err());
        // Allowed name appearing somewhere other than the host does not count
        assert!(
            validate_sprite_url("https://evil.example.com/pokeapi.co/25.png", &limits()).is_err()
        );
        assert!(validate_sprite_url(
            "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/25.png",
            &limits()
        )
        .is_ok());
        assert!(validate_sprite_url("ftp://pokeapi.co/25.png", &limits()).is_err());
    }

    #[test]
    fn test_pokemon_id_param() {
        assert_eq!(validate_pokemon_id("7", &limits()), Ok(7));
        assert!(validate_pokemon_id("-7", &limits()).is_err());
        assert!(validate_pokemon_id("seven", &limits()).is_err());
        assert!(validate_pokemon_id("", &limits()).is_err());
    }

    #[test]
    fn test_parse_leaves_sprite_host_unchecked() {
        let parsed = parse_favorite_payload(&payload(json!({
            "pokemonId": 25,
            "pokemonName": "pikachu",
            "pokemonSprite": "not-a-url"
        })))
        .unwrap();
        assert_eq!(parsed.pokemon_sprite.as_deref(), Some("not-a-url"));

        assert!(parse_favorite_payload(&payload(json!({
            "pokemonId": 25,
            "pokemonName": "pikachu",
            "pokemonSprite": false
        })))
        .is_err());
    }

    #[test]
    fn test_favorite_payload_shapes() {
        let ok = validate_favorite_payload(
            &payload(json!({"pokemonId": 25, "pokemonName": "pikachu"})),
            &limits(),
        )
        .unwrap();
        assert_eq!(ok.pokemon_id, 25);
        assert_eq!(ok.pokemon_sprite, None);

        let missing_id = validate_favorite_payload(
            &payload(json!({"pokemonName": "pikachu"})),
            &limits(),
        );
        assert_eq!(
            missing_id.unwrap_err().reason,
            "Pokemon ID is required"
        );

        assert!(validate_favorite_payload(
            &payload(json!({"pokemonId": -3, "pokemonName": "pikachu"})),
            &limits()
        )
        .is_err());
        assert!(validate_favorite_payload(
            &payload(json!({"pokemonId": 2.5, "pokemonName": "pikachu"})),
            &limits()
        )
        .is_err());
        assert!(validate_favorite_payload(
            &payload(json!({"pokemonId": "25", "pokemonName": "pikachu"})),
            &limits()
        )
        .is_err());
        assert!(validate_favorite_payload(
            &payload(json!({"pokemonId": 25, "pokemonName": "  "})),
            &limits()
        )
        .is_err());
        assert!(validate_favorite_payload(
            &payload(json!({"pokemonId": 25, "pokemonName": "pikachu", "pokemonSprite": 12})),
            &limits()
        )
        .is_err());
        assert!(validate_favorite_payload(
            &payload(json!({
                "pokemonId": 25,
                "pokemonName": "pikachu",
                "pokemonSprite": "https://example.com/25.png"
            })),
            &limits()
        )
        .is_err());
    }
}
