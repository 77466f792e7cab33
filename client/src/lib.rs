//! Pokedex Client Module
//!
//! The client data layer used by the terminal front end: a typed backend
//! over the HTTP API, a keyed query cache, infinite-scroll pagination, and
//! optimistic favorites with rollback and notifications.

pub mod backend;
pub mod cache;
pub mod error;
pub mod favorites;
pub mod identifier;
pub mod pager;
pub mod testing;

pub use backend::{HttpBackend, PokedexBackend};
pub use cache::{QueryCache, QueryKey, QueryStatus};
pub use error::ClientError;
pub use favorites::{FavoritesSync, Notification};
pub use identifier::{is_valid_identifier, normalize_search, INVALID_IDENTIFIER_MESSAGE};
pub use pager::{PageRequest, PokemonPager};

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use pokedex_core::{ClientSettings, Pokemon, PokemonDetailData};

pub const LIST_OPERATION: &str = "pokemon-list";
pub const DETAIL_OPERATION: &str = "pokemon";
pub const SEARCH_OPERATION: &str = "search";
pub const EVOLUTION_SPRITES_OPERATION: &str = "evolution-sprites";

pub const SEARCH_ERROR: &str = "Failed to search Pokémon";

/// Default sprite URL per evolution name; "" when none could be fetched
pub type EvolutionSprites = HashMap<String, String>;

fn send_notification(tx: &mpsc::UnboundedSender<Notification>, notification: Notification) {
    if tx.send(notification).is_err() {
        debug!("Notification dropped: receiver closed");
    }
}

/// Entry point of the data layer. Cheap to clone; clones share caches and
/// the favorites state.
#[derive(Clone)]
pub struct PokedexClient {
    backend: Arc<dyn PokedexBackend>,
    settings: ClientSettings,
    list_cache: QueryCache<Vec<Pokemon>>,
    detail_cache: QueryCache<PokemonDetailData>,
    search_cache: QueryCache<Pokemon>,
    sprite_cache: QueryCache<EvolutionSprites>,
    favorites: FavoritesSync,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl PokedexClient {
    /// Build the client and the receiving end of its notification channel
    pub fn new(
        backend: Arc<dyn PokedexBackend>,
        settings: ClientSettings,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stale_time = Some(settings.stale_time());

        let favorites = FavoritesSync::new(backend.clone(), QueryCache::new(stale_time), tx.clone());
        let client = Self {
            backend,
            settings,
            // List pages never go stale
            list_cache: QueryCache::new(None),
            detail_cache: QueryCache::new(stale_time),
            search_cache: QueryCache::new(stale_time),
            sprite_cache: QueryCache::new(stale_time),
            favorites,
            notifications: tx,
        };
        (client, rx)
    }

    /// Client over the HTTP API described by `settings`
    pub fn connect(
        settings: ClientSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Notification>), ClientError> {
        let backend = HttpBackend::new(&settings)?;
        Ok(Self::new(Arc::new(backend), settings))
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn favorites(&self) -> &FavoritesSync {
        &self.favorites
    }

    /// A fresh pager sized from the settings
    pub fn pager(&self) -> PokemonPager {
        PokemonPager::new(self.settings.items_per_page, self.settings.max_pokemon)
    }

    pub async fn list_page(&self, request: PageRequest) -> Result<Vec<Pokemon>, ClientError> {
        let backend = self.backend.clone();
        let key = QueryKey::new(
            LIST_OPERATION,
            format!("limit={}&offset={}", request.limit, request.offset),
        );
        self.list_cache
            .fetch(key, move || async move {
                backend.list_pokemon(request.limit, request.offset).await
            })
            .await
    }

    pub async fn pokemon_detail(&self, id_or_name: &str) -> Result<PokemonDetailData, ClientError> {
        let backend = self.backend.clone();
        let id_or_name = id_or_name.to_lowercase();
        self.detail_cache
            .fetch(QueryKey::new(DETAIL_OPERATION, id_or_name.clone()), move || async move {
                backend.get_pokemon(&id_or_name).await
            })
            .await
    }

    /// Check the term locally, then search. Failures raise a notification.
    pub async fn search(&self, term: &str) -> Result<Pokemon, ClientError> {
        let Some(name) = normalize_search(term, self.settings.max_pokemon) else {
            self.notify(Notification::Error(INVALID_IDENTIFIER_MESSAGE.to_string()));
            return Err(ClientError::Invalid(INVALID_IDENTIFIER_MESSAGE.to_string()));
        };

        let backend = self.backend.clone();
        let result = self
            .search_cache
            .fetch(QueryKey::new(SEARCH_OPERATION, name.clone()), move || async move {
                backend.search_pokemon(&name).await
            })
            .await;

        if let Err(e) = &result {
            warn!("Search failed: {e}");
            self.notify(Notification::Error(SEARCH_ERROR.to_string()));
        }
        result
    }

    /// Sprites for an evolution line, cached per name list. Each lookup
    /// that fails raises its own notification and maps to "".
    pub async fn evolution_sprites(
        &self,
        evolutions: &[String],
    ) -> Result<EvolutionSprites, ClientError> {
        if evolutions.is_empty() {
            return Ok(EvolutionSprites::new());
        }

        let backend = self.backend.clone();
        let notifications = self.notifications.clone();
        let names = evolutions.to_vec();
        self.sprite_cache
            .fetch(
                QueryKey::new(EVOLUTION_SPRITES_OPERATION, evolutions.join(",")),
                move || async move {
                    let lookups = names.iter().map(|name| {
                        let backend = backend.clone();
                        async move { (name, backend.search_pokemon(&name.to_lowercase()).await) }
                    });

                    let mut sprites = EvolutionSprites::new();
                    for (name, result) in join_all(lookups).await {
                        let sprite = match result {
                            Ok(pokemon) => pokemon.sprites.front_default.unwrap_or_default(),
                            Err(e) => {
                                warn!("Sprite lookup for {name} failed: {e}");
                                let message = match e {
                                    ClientError::Api { message, .. } => message,
                                    _ => format!("Failed to fetch sprite for {name}"),
                                };
                                send_notification(&notifications, Notification::Error(message));
                                String::new()
                            }
                        };
                        sprites.insert(name.clone(), sprite);
                    }
                    Ok(sprites)
                },
            )
            .await
    }

    /// Mark the list stale so the next page reads go to the network
    pub fn invalidate_list(&self) {
        self.list_cache.invalidate(LIST_OPERATION);
    }

    fn notify(&self, notification: Notification) {
        send_notification(&self.notifications, notification);
    }
}
