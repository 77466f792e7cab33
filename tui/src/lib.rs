//! Pokedex TUI Module
//!
//! The TUI module is the terminal front end of the Pokédex: an
//! infinite-scrolling list, a detail pane, search, and favorites management
//! on top of the client data layer.

pub mod app;
pub mod format;
pub mod models;
pub mod ui;

pub use app::{Action, Outcome, PokedexApp};
pub use ui::{draw_frame, draw_with, render};

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::panic;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use pokedex_client::{Notification, PokedexClient};

/// Main TUI application runner
pub struct TuiRunner {
    /// Shared data layer
    client: PokedexClient,
    /// Toasts raised by the data layer
    notifications: mpsc::UnboundedReceiver<Notification>,
}

fn enter_terminal() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)
}

/// Put the terminal back before the panic message is printed
fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        default_hook(info);
    }));
}

impl TuiRunner {
    /// Create a new TUI runner
    pub fn new(client: PokedexClient, notifications: mpsc::UnboundedReceiver<Notification>) -> Self {
        Self {
            client,
            notifications,
        }
    }

    /// Run the TUI application
    pub async fn run(mut self) -> Result<()> {
        info!("Starting Pokédex TUI application...");

        // Setup terminal
        install_panic_hook();
        enter_terminal()?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let mut app = PokedexApp::new(self.client.clone());
        app.initialize();

        let result = self.event_loop(&mut terminal, &mut app).await;

        // Restore terminal even when the loop failed
        drop(panic::take_hook());
        restore_terminal()?;
        terminal.show_cursor()?;

        info!("Pokédex TUI application finished");
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        app: &mut PokedexApp,
    ) -> Result<()> {
        let mut failures = app.failures;
        loop {
            app.drain_outcomes();
            while let Ok(notification) = self.notifications.try_recv() {
                app.show_notification(notification);
            }

            draw_frame(terminal, app)?;
            if app.failures != failures {
                // The panic hook left the alternate screen
                failures = app.failures;
                enter_terminal()?;
                terminal.clear()?;
                draw_frame(terminal, app)?;
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        match app.handle_key_event(key) {
                            Ok(true) => {}
                            Ok(false) => return Ok(()),
                            Err(e) => {
                                error!("Key handling failed: {e:#}");
                                app.fail(format!("{e:#}"));
                            }
                        }
                    }
                }
            }

            // Let spawned requests make progress between frames
            tokio::task::yield_now().await;
        }
    }
}
