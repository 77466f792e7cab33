//! TUI Models Module
//!
//! View state owned by the application and handed to the renderers.

use pokedex_client::EvolutionSprites;
use pokedex_core::{Pokemon, PokemonDetailData};

/// Which screen has the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Scrollable Pokémon list
    List,
    /// Detail pane for the selected Pokémon
    Detail,
    /// Search input
    Search,
    /// Clear-all confirmation
    ConfirmClear,
    /// Shown after an unexpected failure; offers a reset
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Favorites,
}

impl Filter {
    pub fn toggled(self) -> Self {
        match self {
            Filter::All => Filter::Favorites,
            Filter::Favorites => Filter::All,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Filter::All => 0,
            Filter::Favorites => 1,
        }
    }
}

/// A read that may still be running or may have failed
#[derive(Debug, Clone, PartialEq)]
pub enum ReadState<T> {
    Idle,
    Loading,
    Ready(T),
    /// Message shown inline; the read can be retried
    Failed(String),
}

impl<T> Default for ReadState<T> {
    fn default() -> Self {
        ReadState::Idle
    }
}

impl<T> ReadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ReadState::Loading)
    }
}

/// User-facing selection state
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Pokémon shown in the detail pane
    pub selected: Option<Pokemon>,
    pub filter: Filter,
    /// Text typed into the search input
    pub search_query: String,
    /// Detail read for `selected`
    pub detail: ReadState<PokemonDetailData>,
    /// Sprites for the evolutions in `detail`
    pub evolution_sprites: ReadState<EvolutionSprites>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, pokemon: Pokemon) {
        self.selected = Some(pokemon);
        self.detail = ReadState::Loading;
        self.evolution_sprites = ReadState::Idle;
    }

    pub fn close_detail(&mut self) {
        self.selected = None;
        self.detail = ReadState::Idle;
        self.evolution_sprites = ReadState::Idle;
    }
}
