//! TUI App Module
//!
//! This module contains the main TUI application logic. Key handlers turn
//! key presses into [`Action`]s; actions that need the network run as
//! spawned tasks and report back as [`Outcome`]s, so rendering never waits
//! on a request.

pub mod key_handlers;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use pokedex_client::{
    ClientError, EvolutionSprites, Notification, PageRequest, PokedexClient, PokemonPager,
};
use pokedex_core::{Pokemon, PokemonDetailData};

use crate::app::key_handlers::{
    handle_confirm_clear_keys, handle_detail_keys, handle_fallback_keys, handle_list_keys,
    handle_search_keys,
};
use crate::models::{Filter, ReadState, Screen, ViewState};

/// How long a notification stays in the status bar
const TOAST_DURATION: Duration = Duration::from_secs(4);

/// Something the user asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    LoadNextPage,
    OpenDetail(Pokemon),
    ToggleFavorite(Pokemon),
    Search(String),
    ClearFavorites,
    RefreshFavorites,
    /// Repeat the failed read on the current screen
    Retry,
    /// Leave the fallback screen and start over
    Reset,
    Quit,
}

/// Result of a spawned action
#[derive(Debug)]
pub enum Outcome {
    Page(PageRequest, Result<Vec<Pokemon>, ClientError>),
    Detail(u32, Result<PokemonDetailData, ClientError>),
    Sprites(u32, Result<EvolutionSprites, ClientError>),
    Found(Result<Pokemon, ClientError>),
    FavoritesChanged,
    /// A spawned task panicked or was cancelled
    Crashed(String),
}

/// Represents the main TUI application
pub struct PokedexApp {
    /// Current screen
    pub screen: Screen,
    /// Selection, filter, and search state
    pub view: ViewState,
    /// Accumulated list pages
    pub pager: PokemonPager,
    /// Cursor into the visible list
    pub cursor: usize,
    /// Latest notification and when it arrived
    pub toast: Option<(Notification, Instant)>,
    /// Message shown on the fallback screen
    pub fatal: Option<String>,
    /// Failures caught so far, in tasks or while rendering
    pub failures: usize,
    /// Application title
    pub title: String,
    client: PokedexClient,
    outcomes_tx: mpsc::UnboundedSender<Outcome>,
    outcomes_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl PokedexApp {
    /// Create a new TUI application
    pub fn new(client: PokedexClient) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            screen: Screen::List,
            view: ViewState::new(),
            pager: client.pager(),
            cursor: 0,
            toast: None,
            fatal: None,
            failures: 0,
            title: "Pokédex".to_string(),
            client,
            outcomes_tx,
            outcomes_rx,
        }
    }

    pub fn client(&self) -> &PokedexClient {
        &self.client
    }

    /// Start the first page and the favorites fetch
    pub fn initialize(&mut self) {
        info!("Initializing Pokédex TUI");
        self.dispatch(Action::LoadNextPage);
        self.dispatch(Action::RefreshFavorites);
    }

    /// Pokémon shown under the current filter
    pub fn visible_pokemon(&self) -> Vec<&Pokemon> {
        match self.view.filter {
            Filter::All => self.pager.items().iter().collect(),
            Filter::Favorites => {
                let favorites = self.client.favorites().favorite_ids();
                self.pager
                    .items()
                    .iter()
                    .filter(|p| favorites.contains(&p.id))
                    .collect()
            }
        }
    }

    pub fn cursor_pokemon(&self) -> Option<&Pokemon> {
        self.visible_pokemon().get(self.cursor).copied()
    }

    pub fn is_favorite(&self, pokemon_id: u32) -> bool {
        self.client.favorites().is_favorite(pokemon_id)
    }

    pub fn favorite_count(&self) -> usize {
        self.client.favorites().favorite_ids().len()
    }

    pub(crate) fn clamp_cursor(&mut self) {
        let len = self.visible_pokemon().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    /// Handle key events. Returns false when the application should exit.
    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> Result<bool> {
        if key_event.code == KeyCode::Char('c')
            && key_event.modifiers.contains(KeyModifiers::CONTROL)
        {
            return Ok(false);
        }

        let actions = match self.screen {
            Screen::List => handle_list_keys(self, key_event)?,
            Screen::Detail => handle_detail_keys(self, key_event)?,
            Screen::Search => handle_search_keys(self, key_event)?,
            Screen::ConfirmClear => handle_confirm_clear_keys(self, key_event)?,
            Screen::Fallback => handle_fallback_keys(self, key_event)?,
        };

        let mut running = true;
        for action in actions {
            running &= self.dispatch(action);
        }
        Ok(running)
    }

    /// Run an action. Returns false for [`Action::Quit`].
    pub fn dispatch(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::LoadNextPage => {
                if let Some(request) = self.pager.begin() {
                    let client = self.client.clone();
                    self.spawn(async move {
                        Outcome::Page(request, client.list_page(request).await)
                    });
                }
            }
            Action::OpenDetail(pokemon) => {
                let id = pokemon.id;
                self.view.select(pokemon);
                self.screen = Screen::Detail;
                let client = self.client.clone();
                self.spawn(async move {
                    Outcome::Detail(id, client.pokemon_detail(&id.to_string()).await)
                });
            }
            Action::ToggleFavorite(pokemon) => {
                let client = self.client.clone();
                self.spawn(async move {
                    // Failures are reported through notifications
                    let _ = client.favorites().toggle(&pokemon).await;
                    Outcome::FavoritesChanged
                });
            }
            Action::ClearFavorites => {
                let client = self.client.clone();
                self.spawn(async move {
                    let _ = client.favorites().clear().await;
                    Outcome::FavoritesChanged
                });
            }
            Action::RefreshFavorites => {
                let client = self.client.clone();
                self.spawn(async move {
                    if let Err(e) = client.favorites().refresh().await {
                        error!("Failed to load favorites: {e}");
                    }
                    Outcome::FavoritesChanged
                });
            }
            Action::Search(term) => {
                let client = self.client.clone();
                self.spawn(async move { Outcome::Found(client.search(&term).await) });
            }
            Action::Retry => match self.screen {
                Screen::Detail => {
                    if let Some(pokemon) = self.view.selected.clone() {
                        return self.dispatch(Action::OpenDetail(pokemon));
                    }
                }
                _ => {
                    if self.pager.error().is_some() {
                        return self.dispatch(Action::LoadNextPage);
                    }
                }
            },
            Action::Reset => {
                info!("Resetting after failure");
                self.fatal = None;
                self.screen = Screen::List;
                self.view = ViewState::new();
                self.cursor = 0;
                self.pager = self.client.pager();
                self.client.invalidate_list();
                self.initialize();
            }
        }
        true
    }

    /// Run `task` in the background and deliver its outcome. A panic inside
    /// the task becomes [`Outcome::Crashed`].
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let outcome = match tokio::spawn(task).await {
                Ok(outcome) => outcome,
                Err(e) => Outcome::Crashed(e.to_string()),
            };
            if tx.send(outcome).is_err() {
                debug!("Outcome dropped: app closed");
            }
        });
    }

    /// Fold one outcome into the view state
    pub fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Page(request, result) => {
                self.pager.complete(request, result);
            }
            Outcome::Detail(id, result) => {
                if !self.is_selected(id) {
                    return;
                }
                match result {
                    Ok(detail) => {
                        if !detail.evolutions.is_empty() {
                            self.view.evolution_sprites = ReadState::Loading;
                            let client = self.client.clone();
                            let evolutions = detail.evolutions.clone();
                            self.spawn(async move {
                                Outcome::Sprites(id, client.evolution_sprites(&evolutions).await)
                            });
                        }
                        self.view.detail = ReadState::Ready(detail);
                    }
                    Err(e) => self.view.detail = ReadState::Failed(e.to_string()),
                }
            }
            Outcome::Sprites(id, result) => {
                if self.is_selected(id) {
                    self.view.evolution_sprites = match result {
                        Ok(sprites) => ReadState::Ready(sprites),
                        Err(e) => ReadState::Failed(e.to_string()),
                    };
                }
            }
            Outcome::Found(Ok(pokemon)) => {
                self.view.search_query.clear();
                self.dispatch(Action::OpenDetail(pokemon));
            }
            Outcome::Found(Err(_)) => {
                if self.screen == Screen::Search {
                    self.screen = Screen::List;
                }
            }
            Outcome::FavoritesChanged => self.clamp_cursor(),
            Outcome::Crashed(message) => {
                error!("Background task failed: {message}");
                self.fail(message);
            }
        }
    }

    fn is_selected(&self, pokemon_id: u32) -> bool {
        self.view.selected.as_ref().map(|p| p.id) == Some(pokemon_id)
    }

    /// Switch to the fallback screen
    pub fn fail(&mut self, message: impl Into<String>) {
        self.fatal = Some(message.into());
        self.failures += 1;
        self.screen = Screen::Fallback;
    }

    /// Apply every outcome that has already arrived
    pub fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.apply(outcome);
        }
    }

    /// Wait for the next outcome and apply it
    pub async fn next_outcome(&mut self) -> bool {
        match self.outcomes_rx.recv().await {
            Some(outcome) => {
                self.apply(outcome);
                true
            }
            None => false,
        }
    }

    pub fn show_notification(&mut self, notification: Notification) {
        self.toast = Some((notification, Instant::now()));
    }

    /// Notification still within its display time
    pub fn current_toast(&self) -> Option<&Notification> {
        self.toast
            .as_ref()
            .filter(|(_, shown_at)| shown_at.elapsed() < TOAST_DURATION)
            .map(|(notification, _)| notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokedex_client::testing::MemoryBackend;
    use pokedex_core::{ClientSettings, FakeDataSource};
    use std::sync::Arc;

    fn app_with(backend: &MemoryBackend) -> (PokedexApp, mpsc::UnboundedReceiver<Notification>) {
        let (client, notifications) =
            PokedexClient::new(Arc::new(backend.clone()), ClientSettings::default());
        (PokedexApp::new(client), notifications)
    }

    #[tokio::test]
    async fn test_initialize_loads_first_page() {
        let backend = MemoryBackend::with_generated(50);
        let (mut app, _rx) = app_with(&backend);

        app.initialize();
        assert!(app.pager.is_loading());
        app.next_outcome().await;
        app.next_outcome().await;

        assert_eq!(app.pager.fetched(), 20);
        assert_eq!(app.cursor_pokemon().unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_open_detail_fills_detail_state() {
        let backend = MemoryBackend::with_generated(10);
        let (mut app, _rx) = app_with(&backend);

        app.dispatch(Action::OpenDetail(FakeDataSource::sample_pokemon(3, "pokemon-3")));
        assert_eq!(app.screen, Screen::Detail);
        assert!(app.view.detail.is_loading());

        app.next_outcome().await;
        match &app.view.detail {
            ReadState::Ready(detail) => assert_eq!(detail.pokemon.id, 3),
            other => panic!("unexpected detail state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_page_is_retryable() {
        let backend = MemoryBackend::with_generated(10);
        backend.fail_reads(true);
        let (mut app, _rx) = app_with(&backend);

        app.dispatch(Action::LoadNextPage);
        app.next_outcome().await;
        assert_eq!(app.pager.error(), Some(&ClientError::NoResponse));

        backend.fail_reads(false);
        app.dispatch(Action::Retry);
        app.next_outcome().await;
        assert_eq!(app.pager.fetched(), 10);
        assert!(app.pager.error().is_none());
    }

    #[tokio::test]
    async fn test_toggle_favorite_and_filter() {
        let backend = MemoryBackend::with_generated(10);
        let (mut app, mut notifications) = app_with(&backend);
        app.dispatch(Action::LoadNextPage);
        app.next_outcome().await;

        let pokemon = app.cursor_pokemon().cloned().unwrap();
        app.dispatch(Action::ToggleFavorite(pokemon));
        app.next_outcome().await;

        assert!(app.is_favorite(1));
        assert_eq!(notifications.recv().await.unwrap().text(), "Added to favorites!");

        app.view.filter = Filter::Favorites;
        let visible: Vec<u32> = app.visible_pokemon().iter().map(|p| p.id).collect();
        assert_eq!(visible, vec![1]);
    }

    #[tokio::test]
    async fn test_search_opens_detail() {
        let backend = MemoryBackend::with_generated(10);
        let (mut app, _rx) = app_with(&backend);
        app.screen = Screen::Search;

        app.dispatch(Action::Search("pokemon-7".to_string()));
        app.next_outcome().await;
        assert_eq!(app.screen, Screen::Detail);
        assert_eq!(app.view.selected.as_ref().unwrap().id, 7);
    }

    async fn corrupted() -> Outcome {
        panic!("render state corrupted")
    }

    #[tokio::test]
    async fn test_panicking_task_shows_fallback_and_reset_recovers() {
        let backend = MemoryBackend::with_generated(10);
        let (mut app, _rx) = app_with(&backend);

        app.spawn(corrupted());
        app.next_outcome().await;
        assert_eq!(app.screen, Screen::Fallback);
        assert!(app.fatal.is_some());

        assert!(app.dispatch(Action::Reset));
        assert_eq!(app.screen, Screen::List);
        assert!(app.fatal.is_none());
        app.next_outcome().await;
        app.next_outcome().await;
        assert_eq!(app.pager.fetched(), 10);
    }
}
