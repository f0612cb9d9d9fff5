//! Generation model choice.
//!
//! [`SharedModel`] is the one slot every part of the session reads the chosen
//! model from; [`ModelPicker`] holds the fetched list and the popup state.

use tokio::sync::watch;

use crate::remote::ModelInfo;

/// Shared observable slot holding the name of the model to generate with.
#[derive(Debug, Clone)]
pub struct SharedModel {
    tx: watch::Sender<Option<String>>,
}

impl SharedModel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Replace the choice; subscribers hear about actual changes only.
    pub fn set(&self, name: Option<String>) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == name {
                false
            } else {
                *current = name;
                true
            }
        })
    }
}

impl Default for SharedModel {
    fn default() -> Self {
        Self::new()
    }
}

/// The fetched model list and the picker popup.
#[derive(Debug, Default)]
pub struct ModelPicker {
    pub models: Vec<String>,
    /// Why the last fetch failed.
    pub error: Option<String>,
    pub loading: bool,
    pub open: bool,
    pub cursor: usize,
    shared: SharedModel,
    preferred: Option<String>,
}

impl ModelPicker {
    /// `preferred` is chosen over the first model when the server offers it.
    pub fn new(shared: SharedModel, preferred: Option<String>) -> Self {
        Self {
            shared,
            preferred,
            ..Default::default()
        }
    }

    pub fn selected(&self) -> Option<String> {
        self.shared.get()
    }

    fn selected_index(&self) -> Option<usize> {
        let current = self.shared.get()?;
        self.models.iter().position(|m| *m == current)
    }

    pub fn start_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Install a fetched list. The current choice survives if it is still
    /// offered; otherwise the preferred model, otherwise the first one.
    pub fn loaded(&mut self, models: Vec<ModelInfo>) {
        self.loading = false;
        self.error = None;
        self.models = models.into_iter().map(|m| m.name).collect();

        let offered = |name: &String| self.models.contains(name);
        let choice = self
            .shared
            .get()
            .filter(offered)
            .or_else(|| self.preferred.clone().filter(offered))
            .or_else(|| self.models.first().cloned());
        self.shared.set(choice);
        self.cursor = self.selected_index().unwrap_or(0);
    }

    /// The fetch was skipped (no credential); nothing changes.
    pub fn skipped(&mut self) {
        self.loading = false;
    }

    /// A failed fetch keeps the previous list and choice.
    pub fn failed(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    pub fn open(&mut self) {
        self.open = true;
        self.cursor = self.selected_index().unwrap_or(0);
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn next(&mut self) {
        if self.cursor + 1 < self.models.len() {
            self.cursor += 1;
        }
    }

    pub fn previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Make the highlighted model the shared choice and close the popup.
    pub fn choose(&mut self) -> Option<String> {
        let name = self.models.get(self.cursor).cloned()?;
        self.shared.set(Some(name.clone()));
        self.open = false;
        Some(name)
    }
}
