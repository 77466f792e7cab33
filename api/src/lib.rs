//! Pokedex API Module
//!
//! The API module exposes the backend over HTTP: Pokémon reads proxied to the
//! data source, favorites CRUD over the store, a per-IP rate limiter, and
//! the uniform `{status, data|message}` envelope.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod server;

pub use error::AppError;
pub use handlers::*;
pub use rate_limit::{RateDecision, RateLimiter};
pub use server::*;

#[cfg(test)]
mod router_tests;
