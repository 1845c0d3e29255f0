//! Key bindings.
//!
//! | Keys                  | Action          |
//! |-----------------------|-----------------|
//! | `q`, `Ctrl-c`         | quit            |
//! | `j`, `Down`           | one line down   |
//! | `k`, `Up`             | one line up     |
//! | `Ctrl-d` / `Ctrl-u`   | half page       |
//! | `Ctrl-f`, `PageDown`  | page down       |
//! | `Ctrl-b`, `PageUp`    | page up         |
//! | `g g`, `Home`         | top             |
//! | `G`, `End`            | bottom          |
//! | `h`, `Left`           | focus list      |
//! | `l`, `Right`          | focus content   |
//! | `c`                   | copy article    |
//! | `s`                   | toggle stats    |

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    LineUp,
    LineDown,
    HalfPageUp,
    HalfPageDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
    FocusLeft,
    FocusRight,
    Copy,
    ToggleStats,
    Resize(u16, u16),
}

/// Maps terminal events to actions, tracking the two-key `g g` sequence.
#[derive(Debug, Default)]
pub struct KeyMap {
    pending_g: bool,
}

impl KeyMap {
    pub fn map_event(&mut self, event: &Event) -> Option<Action> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.map_key(*key),
            Event::Resize(width, height) => Some(Action::Resize(*width, *height)),
            _ => None,
        }
    }

    /// Any key other than a second `g` cancels a pending `g`.
    pub fn map_key(&mut self, key: KeyEvent) -> Option<Action> {
        let pending_g = std::mem::take(&mut self.pending_g);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        let action = match key.code {
            KeyCode::Char('c') if ctrl => Action::Quit,
            KeyCode::Char('d') if ctrl => Action::HalfPageDown,
            KeyCode::Char('u') if ctrl => Action::HalfPageUp,
            KeyCode::Char('f') if ctrl => Action::PageDown,
            KeyCode::Char('b') if ctrl => Action::PageUp,
            _ if ctrl => return None,
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('j') | KeyCode::Down => Action::LineDown,
            KeyCode::Char('k') | KeyCode::Up => Action::LineUp,
            KeyCode::PageDown => Action::PageDown,
            KeyCode::PageUp => Action::PageUp,
            KeyCode::Char('g') if pending_g => Action::Top,
            KeyCode::Char('g') => {
                self.pending_g = true;
                return None;
            }
            KeyCode::Home => Action::Top,
            KeyCode::Char('G') | KeyCode::End => Action::Bottom,
            KeyCode::Char('h') | KeyCode::Left => Action::FocusLeft,
            KeyCode::Char('l') | KeyCode::Right => Action::FocusRight,
            KeyCode::Char('c') => Action::Copy,
            KeyCode::Char('s') => Action::ToggleStats,
            _ => return None,
        };
        Some(action)
    }
}
