use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use tokio::sync::{broadcast, mpsc};

use crate::document::LoadedDocument;
use crate::error::{Result, SyncError};
use crate::remote::ModelInfo;
use crate::tree::node::{EntryId, Node};
use crate::tree::sync::{MutationOutcome, TreeEngine};

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A periodic tick for rendering and autosave.
    Tick,
    /// Terminal resize event.
    Resize(u16, u16),
    /// The engine published a new tree.
    TreeReplaced(Arc<Vec<Node>>),
    /// The selected file changed.
    SelectionChanged(Option<EntryId>),
    /// The engine reported a failure.
    Report(SyncError),
    /// A dispatched mutation finished.
    MutationDone(MutationOutcome),
    /// Name and content for a file arrived (or failed to).
    DocumentLoaded {
        id: EntryId,
        result: Result<Option<LoadedDocument>>,
    },
    /// A content save finished.
    DocumentSaved {
        id: EntryId,
        revision: u64,
        result: Result<bool>,
    },
    /// A generation request finished.
    Generated {
        id: EntryId,
        result: Result<Option<String>>,
    },
    /// The model list arrived; `None` when it was not fetched.
    ModelsLoaded(Result<Option<Vec<ModelInfo>>>),
}

/// Async event handler that polls crossterm events and forwards them via a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    let forwarded = match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            event_tx.send(Event::Key(key))
                        }
                        Ok(CrosstermEvent::Resize(w, h)) => event_tx.send(Event::Resize(w, h)),
                        _ => Ok(()),
                    };
                    if forwarded.is_err() {
                        break;
                    }
                } else if event_tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Get a sender clone for async tasks to report completions.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Forward the engine's tree, selection and report channels as events.
    pub fn watch_engine(&self, engine: &TreeEngine) {
        spawn_engine_forwarders(engine, self.tx.clone());
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| crate::error::AppError::Terminal("Event channel closed".into()))
    }
}

/// One task per engine channel; each ends when either side goes away.
pub fn spawn_engine_forwarders(engine: &TreeEngine, tx: mpsc::UnboundedSender<Event>) {
    let mut trees = engine.subscribe_tree();
    let tree_tx = tx.clone();
    tokio::spawn(async move {
        while trees.changed().await.is_ok() {
            let roots = trees.borrow_and_update().clone();
            if tree_tx.send(Event::TreeReplaced(roots)).is_err() {
                break;
            }
        }
    });

    let mut selection = engine.selection().subscribe();
    let selection_tx = tx.clone();
    tokio::spawn(async move {
        while selection.changed().await.is_ok() {
            let current = *selection.borrow_and_update();
            if selection_tx.send(Event::SelectionChanged(current)).is_err() {
                break;
            }
        }
    });

    let mut reports = engine.subscribe_reports();
    tokio::spawn(async move {
        loop {
            match reports.recv().await {
                Ok(report) => {
                    if tx.send(Event::Report(report)).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "report forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
