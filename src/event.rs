//! Terminal input: a reader thread plus the key/mouse → action mapping.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossterm::event::{
    self as ct_event, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::alerts::AlertKind;
use crate::app::Action;
use crate::list::SortKey;

/// All terminal events funnelled to the dashboard loop.
#[derive(Debug)]
pub enum AppEvent {
    /// A keypress from the reader thread.
    Key(KeyEvent),
    /// A mouse event from the reader thread.
    Mouse(MouseEvent),
    /// The terminal was resized; triggers a re-render.
    Resize,
    /// Reading the terminal failed; the reader thread has stopped.
    InputError(String),
}

/// Start the blocking terminal reader on its own thread.
///
/// The thread exits when `stop` is set, the receiver is dropped, or the
/// terminal fails (after sending [`AppEvent::InputError`]).
pub fn spawn_reader(tx: UnboundedSender<AppEvent>, stop: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || read_events(poll_terminal, &tx, &stop))
}

/// One terminal event, or `None` when the poll timed out.
fn poll_terminal() -> io::Result<Option<Event>> {
    // Poll with a timeout so the stop flag is checked periodically.
    if ct_event::poll(Duration::from_millis(100))? {
        ct_event::read().map(Some)
    } else {
        Ok(None)
    }
}

fn read_events(
    mut next: impl FnMut() -> io::Result<Option<Event>>,
    tx: &UnboundedSender<AppEvent>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::Relaxed) {
        let event = match next() {
            Ok(Some(Event::Key(key))) => AppEvent::Key(key),
            Ok(Some(Event::Mouse(mouse))) => AppEvent::Mouse(mouse),
            Ok(Some(Event::Resize(_, _))) => AppEvent::Resize,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("terminal input failed: {e}");
                let _ = tx.send(AppEvent::InputError(e.to_string()));
                break;
            }
        };
        if tx.send(event).is_err() {
            break;
        }
    }
}

/// Decode a key press.
#[must_use]
pub fn key_action(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let action = match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
        // Sorting
        (KeyCode::Char('t'), _) => Action::SortBy(SortKey::Time),
        (KeyCode::Char('l'), _) => Action::SortBy(SortKey::Place),
        (KeyCode::Char('m'), _) => Action::SortBy(SortKey::Magnitude),
        // List cursor
        (KeyCode::Char('j') | KeyCode::Down, _) => Action::CursorDown,
        (KeyCode::Char('k') | KeyCode::Up, _) => Action::CursorUp,
        (KeyCode::Char('g') | KeyCode::Home, _) => Action::CursorTop,
        (KeyCode::Char('G') | KeyCode::End, _) => Action::CursorBottom,
        (KeyCode::Enter | KeyCode::Char(' '), _) => Action::ToggleAtCursor,
        (KeyCode::Esc, _) => Action::ClearSelection,
        // Banners
        (KeyCode::Char('a'), _) => Action::Dismiss(AlertKind::Major),
        (KeyCode::Char('w'), _) => Action::Dismiss(AlertKind::Tsunami),
        // Map
        (KeyCode::Char('i'), _) => Action::TogglePopup,
        (KeyCode::Char('+' | '='), _) => Action::ZoomIn,
        (KeyCode::Char('-'), _) => Action::ZoomOut,
        (KeyCode::Char('0'), _) => Action::ResetView,
        _ => return None,
    };
    Some(action)
}

/// Decode a mouse event; only left clicks do anything.
#[must_use]
pub fn mouse_action(mouse: MouseEvent) -> Option<Action> {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Action::Click {
            column: mouse.column,
            row: mouse.row,
        }),
        _ => None,
    }
}
