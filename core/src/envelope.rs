//! Response Envelope
//!
//! Every backend response is wrapped as `{status, results?, data, message?}`
//! on success or `{status, message}` on failure.

use serde::{Deserialize, Serialize};

use crate::models::{Favorite, Pokemon};

pub const STATUS_SUCCESS: &str = "success";
/// Client-side failure (4xx)
pub const STATUS_FAIL: &str = "fail";
/// Server-side failure (5xx)
pub const STATUS_ERROR: &str = "error";

/// Success envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            results: None,
            data,
            message: None,
        }
    }

    pub fn with_results(mut self, results: usize) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Failure envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub message: String,
}

impl ErrorEnvelope {
    /// Build the envelope for an HTTP status code; 5xx is "error", anything
    /// else "fail"
    pub fn for_status(code: u16, message: impl Into<String>) -> Self {
        let status = if code >= 500 { STATUS_ERROR } else { STATUS_FAIL };
        Self {
            status: status.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonListData {
    pub pokemon: Vec<Pokemon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonDetailData {
    pub pokemon: Pokemon,
    #[serde(default)]
    pub evolutions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonData {
    pub pokemon: Pokemon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoritesData {
    pub favorites: Vec<Favorite>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteData {
    pub favorite: Favorite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatus {
    pub is_favorite: bool,
}
