//! Terminal viewer.
//!
//! # Modules
//!
//! - [`layout`]: text to styled, wrapped rows
//! - [`scroll`]: clamped scroll position
//! - [`keys`]: terminal events to [`keys::Action`]s
//! - [`app`]: focus state machine and per-article view state
//! - [`render`]: ratatui drawing
//!
//! The viewer runs on a blocking thread. It only reads from the
//! [`ArticleStore`] and redraws every tick, so bodies appear as the
//! aggregator writes them.

pub mod app;
pub mod keys;
pub mod layout;
pub mod render;
pub mod scroll;

use crate::clipboard::ClipboardWriter;
use crate::config::Settings;
use crate::store::ArticleStore;
use app::{App, Command, Notice};
use crossterm::event;
use keys::KeyMap;
use ratatui::DefaultTerminal;
use std::io;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Take over the terminal and run the viewer until the user quits.
///
/// The terminal is restored on every exit path, including errors.
#[instrument(level = "info", skip_all, fields(articles = store.len()))]
pub fn run<C: ClipboardWriter>(
    store: Arc<ArticleStore>,
    settings: &Settings,
    clipboard: &C,
) -> io::Result<()> {
    let mut terminal = ratatui::try_init()?;
    let result = event_loop(&mut terminal, store, settings, clipboard);
    ratatui::restore();
    result
}

fn event_loop<C: ClipboardWriter>(
    terminal: &mut DefaultTerminal,
    store: Arc<ArticleStore>,
    settings: &Settings,
    clipboard: &C,
) -> io::Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(store, settings.content_width_cap);
    app.resize(size.width, size.height);
    let mut keys = KeyMap::default();
    let tick = settings.tick();

    while !app.should_quit() {
        app.sync_layout();
        terminal.draw(|frame| render::draw(frame, &mut app))?;

        if !event::poll(tick)? {
            continue;
        }
        let Some(action) = keys.map_event(&event::read()?) else {
            continue;
        };
        if let Some(Command::Copy(text)) = app.handle_action(action) {
            match clipboard.write(&text) {
                Ok(()) => app.notify(Notice::info(format!("copied {} characters", text.chars().count()))),
                Err(e) => {
                    warn!(error = %e, "Clipboard write failed");
                    app.notify(Notice::error(format!("copy failed: {e}")));
                }
            }
        }
    }

    info!("Viewer closed");
    Ok(())
}
