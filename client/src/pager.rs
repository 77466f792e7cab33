//! Infinite-scroll pagination over the Pokémon list
//!
//! Each page is requested at the cumulative count of items fetched so far.
//! Paging stops at the ceiling or on an empty page, and a page is never
//! requested while another one is in flight.

use tracing::debug;

use pokedex_core::Pokemon;

use crate::error::ClientError;

/// Window of the next page to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

/// Accumulated list state
#[derive(Debug, Clone)]
pub struct PokemonPager {
    page_size: u32,
    ceiling: u32,
    pokemon: Vec<Pokemon>,
    in_flight: Option<PageRequest>,
    exhausted: bool,
    error: Option<ClientError>,
}

impl PokemonPager {
    pub fn new(page_size: u32, ceiling: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            ceiling,
            pokemon: Vec::new(),
            in_flight: None,
            exhausted: false,
            error: None,
        }
    }

    pub fn items(&self) -> &[Pokemon] {
        &self.pokemon
    }

    pub fn fetched(&self) -> u32 {
        self.pokemon.len() as u32
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    /// Whether another page may exist
    pub fn has_more(&self) -> bool {
        !self.exhausted && self.fetched() < self.ceiling
    }

    /// Reserve the next page. `None` while a page is in flight or once the
    /// list is complete.
    pub fn begin(&mut self) -> Option<PageRequest> {
        if self.is_loading() || !self.has_more() {
            return None;
        }

        let offset = self.fetched();
        let request = PageRequest {
            limit: self.page_size.min(self.ceiling - offset),
            offset,
        };
        self.in_flight = Some(request);
        self.error = None;
        debug!("Requesting page limit={} offset={}", request.limit, request.offset);
        Some(request)
    }

    /// Apply the outcome of the page reserved by [`PokemonPager::begin`].
    /// Outcomes for any other window are ignored.
    pub fn complete(&mut self, request: PageRequest, result: Result<Vec<Pokemon>, ClientError>) {
        if self.in_flight != Some(request) {
            debug!("Ignoring stale page at offset {}", request.offset);
            return;
        }
        self.in_flight = None;

        match result {
            Ok(page) if page.is_empty() => self.exhausted = true,
            Ok(page) => {
                let room = (self.ceiling - self.fetched()) as usize;
                self.pokemon.extend(page.into_iter().take(room));
            }
            Err(e) => self.error = Some(e),
        }
    }

    /// Forget everything fetched so far
    pub fn reset(&mut self) {
        self.pokemon.clear();
        self.in_flight = None;
        self.exhausted = false;
        self.error = None;
    }
}
