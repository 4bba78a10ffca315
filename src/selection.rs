//! The shared selection cell.
//!
//! Exactly one owner (the dashboard) writes it; the list and the map read it.
//! Writers go through `select`/`toggle`/`clear`, and subscribers are only
//! woken when the value actually changes.

use tokio::sync::watch;

/// Currently selected event ID, if any.
#[derive(Debug)]
pub struct Selection {
    tx: watch::Sender<Option<String>>,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// The selected ID.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.tx.borrow().as_deref() == Some(id)
    }

    /// Select `id`, replacing any previous selection.
    pub fn select(&self, id: &str) {
        self.tx.send_if_modified(|current| {
            if current.as_deref() == Some(id) {
                return false;
            }
            *current = Some(id.to_string());
            true
        });
    }

    /// Select `id`, or clear the selection if `id` is already selected.
    pub fn toggle(&self, id: &str) {
        self.tx.send_modify(|current| {
            if current.as_deref() == Some(id) {
                *current = None;
            } else {
                *current = Some(id.to_string());
            }
        });
    }

    pub fn clear(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    /// A receiver that observes future changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}
