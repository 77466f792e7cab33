//! Favorites synchronisation
//!
//! Mutations update the local id set before the request resolves. A failed
//! request restores the snapshot taken just before the change and raises an
//! error notification; a successful one invalidates the favorites query and
//! refetches it to reconcile the id set with the server.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use pokedex_core::{Favorite, NewFavorite, Pokemon};

use crate::backend::PokedexBackend;
use crate::cache::{QueryCache, QueryKey};
use crate::error::ClientError;

pub const FAVORITES_OPERATION: &str = "favorites";

pub const ADD_FAVORITE_SUCCESS: &str = "Added to favorites!";
pub const REMOVE_FAVORITE_SUCCESS: &str = "Removed from favorites!";
pub const CLEAR_FAVORITES_SUCCESS: &str = "All favorites cleared!";
pub const ADD_FAVORITE_ERROR: &str = "Failed to add to favorites";
pub const REMOVE_FAVORITE_ERROR: &str = "Failed to remove from favorites";
pub const CLEAR_FAVORITES_ERROR: &str = "Failed to clear favorites";

/// User-visible toast message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

impl Notification {
    pub fn text(&self) -> &str {
        match self {
            Notification::Success(text) | Notification::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Error(_))
    }
}

fn favorites_key() -> QueryKey {
    QueryKey::new(FAVORITES_OPERATION, "")
}

/// Optimistic favorites state shared by every view
#[derive(Clone)]
pub struct FavoritesSync {
    backend: Arc<dyn PokedexBackend>,
    cache: QueryCache<Vec<Favorite>>,
    ids: Arc<Mutex<HashSet<u32>>>,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl FavoritesSync {
    pub fn new(
        backend: Arc<dyn PokedexBackend>,
        cache: QueryCache<Vec<Favorite>>,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            backend,
            cache,
            ids: Arc::new(Mutex::new(HashSet::new())),
            notifications,
        }
    }

    fn lock_ids(&self) -> MutexGuard<'_, HashSet<u32>> {
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            debug!("Notification dropped: receiver closed");
        }
    }

    /// Current local id set
    pub fn favorite_ids(&self) -> HashSet<u32> {
        self.lock_ids().clone()
    }

    pub fn is_favorite(&self, pokemon_id: u32) -> bool {
        self.lock_ids().contains(&pokemon_id)
    }

    /// Last fetched favorites list, possibly stale
    pub fn cached(&self) -> Vec<Favorite> {
        self.cache.get(&favorites_key()).unwrap_or_default()
    }

    /// Fetch the favorites list (cached) and replace the local id set with it
    pub async fn refresh(&self) -> Result<Vec<Favorite>, ClientError> {
        let backend = self.backend.clone();
        let favorites = self
            .cache
            .fetch(favorites_key(), move || async move {
                backend.list_favorites().await
            })
            .await?;

        *self.lock_ids() = favorites.iter().map(|f| f.pokemon_id).collect();
        Ok(favorites)
    }

    /// Snapshot, apply the local change, return the snapshot
    fn apply_local(&self, change: impl FnOnce(&mut HashSet<u32>)) -> HashSet<u32> {
        let mut ids = self.lock_ids();
        let snapshot = ids.clone();
        change(&mut *ids);
        snapshot
    }

    fn restore(&self, snapshot: HashSet<u32>) {
        *self.lock_ids() = snapshot;
    }

    async fn reconcile(&self) {
        self.cache.invalidate(FAVORITES_OPERATION);
        if let Err(e) = self.refresh().await {
            warn!("Failed to refetch favorites: {e}");
        }
    }

    async fn settle(
        &self,
        snapshot: HashSet<u32>,
        result: Result<(), ClientError>,
        success: &str,
        failure: &str,
    ) -> Result<(), ClientError> {
        match result {
            Ok(()) => {
                self.notify(Notification::Success(success.to_string()));
                self.reconcile().await;
                Ok(())
            }
            Err(e) => {
                warn!("{failure}: {e}");
                self.restore(snapshot);
                self.notify(Notification::Error(failure.to_string()));
                Err(e)
            }
        }
    }

    pub async fn add(&self, pokemon: &Pokemon) -> Result<(), ClientError> {
        let request = NewFavorite::from_pokemon(pokemon);
        let snapshot = self.apply_local(|ids| {
            ids.insert(pokemon.id);
        });

        let result = self.backend.add_favorite(&request).await.map(|_| ());
        self.settle(snapshot, result, ADD_FAVORITE_SUCCESS, ADD_FAVORITE_ERROR)
            .await
    }

    pub async fn remove(&self, pokemon_id: u32) -> Result<(), ClientError> {
        let snapshot = self.apply_local(|ids| {
            ids.remove(&pokemon_id);
        });

        let result = self.backend.remove_favorite(pokemon_id).await;
        self.settle(snapshot, result, REMOVE_FAVORITE_SUCCESS, REMOVE_FAVORITE_ERROR)
            .await
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        let snapshot = self.apply_local(|ids| ids.clear());

        let result = self.backend.clear_favorites().await;
        self.settle(snapshot, result, CLEAR_FAVORITES_SUCCESS, CLEAR_FAVORITES_ERROR)
            .await
    }

    /// Remove if currently a favorite, add otherwise
    pub async fn toggle(&self, pokemon: &Pokemon) -> Result<(), ClientError> {
        if self.is_favorite(pokemon.id) {
            self.remove(pokemon.id).await
        } else {
            self.add(pokemon).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;
    use pokedex_core::FakeDataSource;

    fn sync_with(backend: MemoryBackend) -> (FavoritesSync, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sync = FavoritesSync::new(Arc::new(backend), QueryCache::new(None), tx);
        (sync, rx)
    }

    #[tokio::test]
    async fn test_add_success_notifies_and_reconciles() {
        let backend = MemoryBackend::with_generated(10);
        let (sync, mut rx) = sync_with(backend.clone());

        let pokemon = FakeDataSource::sample_pokemon(5, "pokemon-5");
        sync.add(&pokemon).await.unwrap();

        assert!(sync.is_favorite(5));
        assert_eq!(
            rx.recv().await,
            Some(Notification::Success(ADD_FAVORITE_SUCCESS.to_string()))
        );
        assert_eq!(sync.cached().len(), 1);
        assert_eq!(backend.favorite_ids(), vec![5]);
    }

    #[tokio::test]
    async fn test_failed_add_restores_previous_id_set() {
        let backend = MemoryBackend::with_generated(10);
        let (sync, mut rx) = sync_with(backend.clone());
        sync.add(&FakeDataSource::sample_pokemon(1, "pokemon-1"))
            .await
            .unwrap();
        rx.recv().await;

        let before = sync.favorite_ids();
        backend.fail_mutations(true);

        let result = sync.add(&FakeDataSource::sample_pokemon(2, "pokemon-2")).await;
        assert_eq!(result, Err(ClientError::NoResponse));
        assert_eq!(sync.favorite_ids(), before);

        let notification = rx.recv().await.unwrap();
        assert!(notification.is_error());
        assert_eq!(notification.text(), ADD_FAVORITE_ERROR);
    }

    #[tokio::test]
    async fn test_failed_remove_and_clear_roll_back() {
        let backend = MemoryBackend::with_generated(10);
        let (sync, mut rx) = sync_with(backend.clone());
        for id in [1, 2] {
            sync.add(&FakeDataSource::sample_pokemon(id, &format!("pokemon-{id}")))
                .await
                .unwrap();
        }
        let before = sync.favorite_ids();

        backend.fail_mutations(true);
        assert!(sync.remove(1).await.is_err());
        assert_eq!(sync.favorite_ids(), before);
        assert!(sync.clear().await.is_err());
        assert_eq!(sync.favorite_ids(), before);

        let mut texts = Vec::new();
        while let Ok(notification) = rx.try_recv() {
            texts.push(notification.text().to_string());
        }
        assert!(texts.ends_with(&[
            REMOVE_FAVORITE_ERROR.to_string(),
            CLEAR_FAVORITES_ERROR.to_string()
        ]));
    }

    #[tokio::test]
    async fn test_toggle_and_clear() {
        let backend = MemoryBackend::with_generated(10);
        let (sync, _rx) = sync_with(backend.clone());
        let pokemon = FakeDataSource::sample_pokemon(3, "pokemon-3");

        sync.toggle(&pokemon).await.unwrap();
        assert!(sync.is_favorite(3));
        sync.toggle(&pokemon).await.unwrap();
        assert!(!sync.is_favorite(3));

        sync.toggle(&pokemon).await.unwrap();
        sync.clear().await.unwrap();
        assert!(sync.favorite_ids().is_empty());
        assert!(backend.favorite_ids().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_local_ids_with_server_state() {
        let backend = MemoryBackend::with_generated(10);
        backend.seed_favorite(7);
        let (sync, _rx) = sync_with(backend);

        sync.refresh().await.unwrap();
        assert_eq!(sync.favorite_ids(), HashSet::from([7]));
    }
}
