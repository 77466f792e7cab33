//! TUI Key Handlers Module
//!
//! This module contains the key handling logic for the TUI system. Handlers
//! only touch local view state; anything involving the backend is returned
//! as an [`Action`].

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{Action, PokedexApp};
use crate::models::{Filter, ReadState, Screen};

/// Rows from the end of the list at which the next page is requested
pub const SCROLL_THRESHOLD: usize = 5;

fn near_end(app: &PokedexApp) -> bool {
    let len = app.visible_pokemon().len();
    len == 0 || app.cursor + SCROLL_THRESHOLD >= len
}

/// Pages are only loaded from the full list, never from the favorites view
fn load_more_if_needed(app: &PokedexApp, actions: &mut Vec<Action>) {
    if app.view.filter == Filter::Favorites {
        return;
    }
    if near_end(app) && app.pager.has_more() && !app.pager.is_loading() {
        actions.push(Action::LoadNextPage);
    }
}

/// Handle keys on the list screen
pub fn handle_list_keys(app: &mut PokedexApp, key_event: KeyEvent) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    match key_event.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let len = app.visible_pokemon().len();
            if app.cursor + 1 < len {
                app.cursor += 1;
            }
            load_more_if_needed(app, &mut actions);
        }
        KeyCode::PageDown => {
            let len = app.visible_pokemon().len();
            app.cursor = (app.cursor + 10).min(len.saturating_sub(1));
            load_more_if_needed(app, &mut actions);
        }
        KeyCode::Enter => {
            if let Some(pokemon) = app.cursor_pokemon().cloned() {
                actions.push(Action::OpenDetail(pokemon));
            }
        }
        KeyCode::Char('f') | KeyCode::Char(' ') => {
            if let Some(pokemon) = app.cursor_pokemon().cloned() {
                actions.push(Action::ToggleFavorite(pokemon));
            }
        }
        KeyCode::Tab => {
            app.view.filter = app.view.filter.toggled();
            app.cursor = 0;
        }
        KeyCode::Char('/') | KeyCode::Char('s') => {
            app.view.search_query.clear();
            app.screen = Screen::Search;
        }
        KeyCode::Char('c') => {
            if app.favorite_count() > 0 {
                app.screen = Screen::ConfirmClear;
            }
        }
        KeyCode::Char('r') => actions.push(Action::Retry),
        KeyCode::Char('q') | KeyCode::Esc => actions.push(Action::Quit),
        _ => {}
    }
    Ok(actions)
}

/// Handle keys on the detail pane
pub fn handle_detail_keys(app: &mut PokedexApp, key_event: KeyEvent) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    match key_event.code {
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Left => {
            app.view.close_detail();
            app.screen = Screen::List;
        }
        KeyCode::Char('f') | KeyCode::Char(' ') => {
            if let Some(pokemon) = app.view.selected.clone() {
                actions.push(Action::ToggleFavorite(pokemon));
            }
        }
        KeyCode::Char('r') => {
            if matches!(app.view.detail, ReadState::Failed(_)) {
                actions.push(Action::Retry);
            }
        }
        KeyCode::Char('q') => actions.push(Action::Quit),
        _ => {}
    }
    Ok(actions)
}

/// Handle keys in the search input
pub fn handle_search_keys(app: &mut PokedexApp, key_event: KeyEvent) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    match key_event.code {
        KeyCode::Esc => {
            app.view.search_query.clear();
            app.screen = Screen::List;
        }
        KeyCode::Enter => {
            let term = app.view.search_query.trim().to_string();
            if !term.is_empty() {
                actions.push(Action::Search(term));
            }
        }
        KeyCode::Backspace => {
            app.view.search_query.pop();
        }
        KeyCode::Char(c) => app.view.search_query.push(c),
        _ => {}
    }
    Ok(actions)
}

/// Handle keys on the clear-all confirmation
pub fn handle_confirm_clear_keys(
    app: &mut PokedexApp,
    key_event: KeyEvent,
) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            actions.push(Action::ClearFavorites);
            app.screen = Screen::List;
        }
        KeyCode::Char('n') | KeyCode::Esc => app.screen = Screen::List,
        _ => {}
    }
    Ok(actions)
}

/// Handle keys on the fallback screen
pub fn handle_fallback_keys(_app: &mut PokedexApp, key_event: KeyEvent) -> Result<Vec<Action>> {
    Ok(match key_event.code {
        KeyCode::Char('r') | KeyCode::Enter => vec![Action::Reset],
        KeyCode::Char('q') | KeyCode::Esc => vec![Action::Quit],
        _ => Vec::new(),
    })
}
