//! API Server Module
//!
//! This module contains the server setup functionality for the API system.

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use pokedex_core::{PokedexConfig, PokemonDataSource, ServerSettings};
use pokedex_databases::FavoritesStore;

use crate::handlers::{
    add_favorite, api_index, check_favorite, clear_favorites, get_pokemon, health_check,
    list_favorites, list_pokemon, not_found, remove_favorite, search_pokemon, ApiState,
};
use crate::rate_limit::{rate_limit, RateLimiter};

/// Assemble the full application: versioned API routes and health check
/// behind the rate limiter, the fallback, and the middleware stack
pub fn build_router(
    state: Arc<ApiState>,
    rate_limiter: Arc<RateLimiter>,
    body_limit_bytes: usize,
) -> Router {
    let v1 = Router::new()
        .route("/", get(api_index))
        // Pokémon reads
        .route("/pokemon", get(list_pokemon))
        .route("/pokemon/search/:name", get(search_pokemon))
        .route("/pokemon/:id", get(get_pokemon))
        // Favorites
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/clear", delete(clear_favorites))
        .route("/favorites/check/:pokemon_id", get(check_favorite))
        .route("/favorites/:pokemon_id", delete(remove_favorite));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    // Everything under /api is rate limited, unmatched /api paths included
    let api = Router::new()
        .nest("/v1", v1)
        .route("/health", get(health_check))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Main API server
pub struct ApiServer {
    /// Server configuration
    config: ServerSettings,
    /// Per-IP request counter
    rate_limiter: Arc<RateLimiter>,
    /// Shared state
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: &PokedexConfig,
        data_source: Arc<dyn PokemonDataSource>,
        favorites: Arc<dyn FavoritesStore>,
    ) -> Self {
        let state = Arc::new(ApiState {
            data_source,
            favorites,
            limits: config.limits.clone(),
        });

        Self {
            config: config.server.clone(),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            state,
        }
    }

    pub fn state(&self) -> Arc<ApiState> {
        self.state.clone()
    }

    pub fn router(&self) -> Router {
        build_router(
            self.state.clone(),
            self.rate_limiter.clone(),
            self.config.body_limit_bytes,
        )
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM
    pub async fn start(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}"))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        info!("Pokédex API server listening on {local_addr}");

        let app = self.router();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start API server: {}", e))?;

        info!("Pokédex API server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
