//! TUI UI Module
//!
//! This module contains the UI rendering functionality for the TUI system.

use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

use pokedex_core::Pokemon;

use crate::app::PokedexApp;
use crate::format::{format_height, format_name, format_weight, sprite_label};
use crate::models::{Filter, ReadState, Screen};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Draw one frame with [`render`]
pub fn draw_frame<B: Backend>(terminal: &mut Terminal<B>, app: &mut PokedexApp) -> io::Result<()> {
    draw_with(terminal, app, render)
}

/// Draw one frame. A panic inside `render_fn` switches the app to the
/// fallback screen; a second one while the fallback is showing is an error.
pub fn draw_with<B, R>(terminal: &mut Terminal<B>, app: &mut PokedexApp, render_fn: R) -> io::Result<()>
where
    B: Backend,
    R: FnOnce(&mut PokedexApp, &mut Frame),
{
    let drawn = panic::catch_unwind(AssertUnwindSafe(|| {
        terminal.draw(|frame| render_fn(app, frame)).map(|_| ())
    }));

    match drawn {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Rendering failed: {message}");
            if app.screen == Screen::Fallback {
                return Err(io::Error::other(format!("Rendering failed: {message}")));
            }
            app.fail(format!("Rendering failed: {message}"));
            terminal.clear()
        }
    }
}

/// Render the UI
pub fn render(app: &mut PokedexApp, frame: &mut Frame) {
    let size = frame.area();
    frame.render_widget(Clear, size);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Filter tabs
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Status bar
        ])
        .split(size);

    let title = Paragraph::new(app.title.as_str())
        .style(
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, chunks[0]);

    let favorites_tab = format!("Favorites ({})", app.favorite_count());
    let tabs = Tabs::new(vec!["All Pokémon".to_string(), favorites_tab])
        .block(Block::default().borders(Borders::BOTTOM))
        .select(app.view.filter.index())
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Yellow));
    frame.render_widget(tabs, chunks[1]);

    match app.screen {
        Screen::List => render_list(app, frame, chunks[2]),
        Screen::Detail => render_detail(app, frame, chunks[2]),
        Screen::Search => {
            render_list(app, frame, chunks[2]);
            render_search(app, frame, chunks[2]);
        }
        Screen::ConfirmClear => {
            render_list(app, frame, chunks[2]);
            render_confirm_clear(app, frame, chunks[2]);
        }
        Screen::Fallback => render_fallback(app, frame, chunks[2]),
    }

    render_status(app, frame, chunks[3]);
}

fn favorite_marker(app: &PokedexApp, pokemon: &Pokemon) -> &'static str {
    if app.is_favorite(pokemon.id) {
        "★"
    } else {
        "☆"
    }
}

/// Render the Pokémon list
fn render_list(app: &mut PokedexApp, frame: &mut Frame, area: Rect) {
    app.clamp_cursor();
    let app: &PokedexApp = app;

    let mut items: Vec<ListItem> = app
        .visible_pokemon()
        .into_iter()
        .map(|pokemon| {
            ListItem::new(format!(
                "{} #{:03} {:<16} {}",
                favorite_marker(app, pokemon),
                pokemon.id,
                format_name(&pokemon.name),
                pokemon.type_names().join("/"),
            ))
            .style(Style::default().fg(Color::White))
        })
        .collect();

    if app.pager.is_loading() {
        items.push(ListItem::new("Loading more Pokémon...").style(Style::default().fg(Color::Gray)));
    } else if let Some(error) = app.pager.error() {
        items.push(
            ListItem::new(format!("{error} (press r to retry)"))
                .style(Style::default().fg(Color::Red)),
        );
    } else if items.is_empty() {
        let empty = match app.view.filter {
            Filter::All => "No Pokémon to show",
            Filter::Favorites => "No favorites yet. Start adding some!",
        };
        items.push(ListItem::new(empty).style(Style::default().fg(Color::Gray)));
    }

    let mut state = ListState::default();
    state.select(Some(app.cursor));

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Pokémon"))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(list, area, &mut state);
}

/// Render the detail pane
fn render_detail(app: &PokedexApp, frame: &mut Frame, area: Rect) {
    let Some(pokemon) = app.view.selected.as_ref() else {
        return;
    };

    let label = Style::default().fg(Color::Yellow);
    let mut lines = vec![
        Line::from(Span::styled(
            format!(
                "{} {} #{:03}",
                favorite_marker(app, pokemon),
                format_name(&pokemon.name),
                pokemon.id
            ),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![Span::styled("Image:     ", label), Span::raw(sprite_label(pokemon))]),
        Line::from(vec![
            Span::styled("Types:     ", label),
            Span::raw(pokemon.type_names().join(", ")),
        ]),
        Line::from(vec![
            Span::styled("Abilities: ", label),
            Span::raw(
                pokemon
                    .abilities
                    .iter()
                    .map(|a| format_name(&a.ability.name))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]),
        Line::from(vec![Span::styled("Height:    ", label), Span::raw(format_height(pokemon.height))]),
        Line::from(vec![Span::styled("Weight:    ", label), Span::raw(format_weight(pokemon.weight))]),
        Line::from(""),
    ];

    match &app.view.detail {
        ReadState::Idle | ReadState::Loading => {
            lines.push(Line::from(vec![
                Span::styled("Evolutions: ", label),
                Span::raw("Loading..."),
            ]));
        }
        ReadState::Ready(detail) if detail.evolutions.is_empty() => {
            lines.push(Line::from(vec![
                Span::styled("Evolutions: ", label),
                Span::raw("None"),
            ]));
        }
        ReadState::Ready(detail) => {
            lines.push(Line::from(Span::styled("Evolutions:", label)));
            for (index, name) in detail.evolutions.iter().enumerate() {
                let sprite = match &app.view.evolution_sprites {
                    ReadState::Ready(sprites) => match sprites.get(name) {
                        Some(url) if !url.is_empty() => url.clone(),
                        _ => "?".to_string(),
                    },
                    ReadState::Failed(_) => "?".to_string(),
                    ReadState::Idle | ReadState::Loading => "...".to_string(),
                };
                let arrow = if index == 0 { "  " } else { "→ " };
                lines.push(Line::from(vec![
                    Span::raw(format!("{arrow}{:<14} ", format_name(name))),
                    Span::styled(sprite, Style::default().fg(Color::Gray)),
                ]));
            }
        }
        ReadState::Failed(message) => {
            lines.push(Line::from(vec![
                Span::styled("Evolutions: ", label),
                Span::styled(
                    format!("{message} (press r to retry)"),
                    Style::default().fg(Color::Red),
                ),
            ]));
        }
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Centered popup area
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_search(app: &PokedexApp, frame: &mut Frame, area: Rect) {
    let popup = popup_area(area, 50, 3);
    let input = Paragraph::new(format!("{}_", app.view.search_query)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Search by name or ID"),
    );
    frame.render_widget(Clear, popup);
    frame.render_widget(input, popup);
}

fn render_confirm_clear(app: &PokedexApp, frame: &mut Frame, area: Rect) {
    let popup = popup_area(area, 50, 5);
    let text = format!(
        "Remove all {} favorites?\n\n[y] Clear all   [n] Cancel",
        app.favorite_count()
    );
    let dialog = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Clear favorites"))
        .wrap(Wrap { trim: true });
    frame.render_widget(Clear, popup);
    frame.render_widget(dialog, popup);
}

fn render_fallback(app: &PokedexApp, frame: &mut Frame, area: Rect) {
    let message = app.fatal.as_deref().unwrap_or("Unknown error");
    let text = format!("Something went wrong.\n\n{message}\n\nPress r to reset or q to quit.");
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::Red))
        .block(Block::default().borders(Borders::ALL).title("Error"))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_status(app: &PokedexApp, frame: &mut Frame, area: Rect) {
    let (text, style) = match app.current_toast() {
        Some(toast) if toast.is_error() => (toast.text().to_string(), Style::default().fg(Color::Red)),
        Some(toast) => (toast.text().to_string(), Style::default().fg(Color::Green)),
        None => {
            let help = match app.screen {
                Screen::List => "↑↓ move  Enter details  f favorite  Tab filter  / search  c clear  q quit",
                Screen::Detail => "Esc back  f favorite  r retry  q quit",
                Screen::Search => "Enter search  Esc cancel",
                Screen::ConfirmClear => "y confirm  n cancel",
                Screen::Fallback => "r reset  q quit",
            };
            (help.to_string(), Style::default().fg(Color::Gray))
        }
    };

    let status = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, area);
}
