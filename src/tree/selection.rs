use tokio::sync::watch;

use crate::tree::node::EntryId;

/// Shared observable slot holding the currently selected file id.
///
/// Created once per session and handed to both the tree and the document
/// editor. Cloning yields another handle to the same slot.
#[derive(Debug, Clone)]
pub struct SelectionBroadcaster {
    tx: watch::Sender<Option<EntryId>>,
}

impl SelectionBroadcaster {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// The currently selected file id.
    pub fn get(&self) -> Option<EntryId> {
        *self.tx.borrow()
    }

    /// Replace the selection. Subscribers are only notified when the value
    /// actually changes. Returns whether it changed.
    pub fn set(&self, file: Option<EntryId>) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == file {
                false
            } else {
                *current = file;
                true
            }
        })
    }

    /// Clear the selection if it currently points at `file`.
    pub fn clear_if(&self, file: EntryId) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == Some(file) {
                *current = None;
                true
            } else {
                false
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<EntryId>> {
        self.tx.subscribe()
    }
}

impl Default for SelectionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
