use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::document::{DocumentEditor, DocumentService, LoadedDocument, SaveRequest};
use crate::error::{Result, SyncError};
use crate::event::Event;
use crate::modal::{InputField, ModalCoordinator, ModalMode};
use crate::models::ModelPicker;
use crate::remote::ModelInfo;
use crate::tree::node::{self, EntryId, Node, NodeKey, NodeKind};
use crate::tree::state::{Activation, MenuAction, TreeState};
use crate::tree::sync::{MutationOutcome, PendingMutation, TreeEngine};

/// How long a status message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(4);

/// Which pane receives keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Tree,
    Document,
}

/// Main application state.
pub struct App {
    pub tree_state: TreeState,
    pub modal: ModalCoordinator,
    pub editor: DocumentEditor,
    pub models: ModelPicker,
    pub focus: Focus,
    pub should_quit: bool,
    pub status_message: Option<(String, Instant)>,
    pub use_icons: bool,
    engine: TreeEngine,
    documents: DocumentService,
    events: mpsc::UnboundedSender<Event>,
    autosave: Option<Duration>,
    last_autosave: Instant,
    /// Tail of the save queue; each save waits for the one before it.
    save_chain: Option<JoinHandle<()>>,
    /// The most recently queued save, until its result arrives.
    last_queued: Option<SaveRequest>,
}

impl App {
    pub fn new(
        engine: TreeEngine,
        documents: DocumentService,
        events: mpsc::UnboundedSender<Event>,
        models: ModelPicker,
        autosave: Option<Duration>,
        use_icons: bool,
    ) -> Self {
        Self {
            tree_state: TreeState::new(),
            modal: ModalCoordinator::new(),
            editor: DocumentEditor::new(),
            models,
            focus: Focus::Tree,
            should_quit: false,
            status_message: None,
            use_icons,
            engine,
            documents,
            events,
            autosave,
            last_autosave: Instant::now(),
            save_chain: None,
            last_queued: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.documents.is_authenticated()
    }

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message once it has been shown long enough.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, created)) = &self.status_message {
            if created.elapsed() > STATUS_TTL {
                self.status_message = None;
            }
        }
    }

    // ── Engine dispatch ────────────────────────────────────────────────

    /// Start a resync in the background; the result arrives as
    /// [`Event::TreeReplaced`].
    pub fn request_resync(&self) {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            engine.resync().await;
        });
    }

    /// Pick up a token written after startup and reload the tree with it.
    pub fn reload_credentials(&mut self) {
        if self.documents.reload_credentials() {
            tracing::info!("session token reloaded");
            self.set_status_message("Signed in".into());
            self.request_resync();
            self.request_models();
        } else if self.is_authenticated() {
            self.set_status_message("Session token unchanged".into());
        } else {
            self.set_status_message("⚠ No session token found".into());
        }
    }

    /// Hand a mutation to the engine without waiting for it.
    pub fn dispatch(&self, mutation: PendingMutation) {
        let engine = self.engine.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let outcome = engine.apply(mutation).await;
            let _ = tx.send(Event::MutationDone(outcome));
        });
    }

    // ── Incoming events ────────────────────────────────────────────────

    pub fn handle_tree_replaced(&mut self, roots: Arc<Vec<Node>>) {
        self.tree_state.replace_tree(roots);
    }

    pub fn handle_selection_changed(&mut self, selection: Option<EntryId>) {
        self.tree_state.sync_selection(selection);
        if selection != self.editor.current() {
            // The outgoing document is closed below; its edits go out first.
            if let Some(request) = self.editor.save_request() {
                self.queue_save(request);
            }
        }
        if let Some(id) = self.editor.follow(selection) {
            self.load_document(id);
        } else if selection.is_none() && self.focus == Focus::Document {
            self.focus = Focus::Tree;
        }
    }

    pub fn handle_report(&mut self, report: SyncError) {
        self.set_status_message(format!("⚠ {}", report));
    }

    pub fn handle_mutation_done(&mut self, outcome: MutationOutcome) {
        tracing::debug!(?outcome, "mutation finished");
    }

    pub fn handle_document_loaded(
        &mut self,
        id: EntryId,
        result: Result<Option<LoadedDocument>>,
    ) {
        match result {
            Ok(Some(doc)) => {
                if self.editor.loaded(doc) {
                    self.last_autosave = Instant::now();
                }
            }
            Ok(None) => self.editor.load_failed(id),
            Err(e) => {
                tracing::error!(file = id, error = %e, "document load failed");
                self.editor.load_failed(id);
                if self.editor.current().is_none() {
                    self.set_status_message(format!("⚠ Failed to open file: {}", e));
                }
            }
        }
    }

    pub fn handle_document_saved(&mut self, id: EntryId, revision: u64, result: Result<bool>) {
        if self
            .last_queued
            .as_ref()
            .is_some_and(|queued| queued.id == id && queued.revision == revision)
        {
            self.last_queued = None;
        }
        match result {
            Ok(true) => self.editor.saved(id, revision),
            Ok(false) => self.set_status_message("⚠ Not signed in, not saved".into()),
            Err(e) => {
                tracing::error!(file = id, error = %e, "document save failed");
                self.set_status_message(format!("⚠ Save failed: {}", e));
            }
        }
    }

    pub fn handle_models_loaded(&mut self, result: Result<Option<Vec<ModelInfo>>>) {
        match result {
            Ok(Some(models)) => {
                tracing::debug!(count = models.len(), "models loaded");
                self.models.loaded(models);
            }
            Ok(None) => self.models.skipped(),
            Err(e) => {
                tracing::error!(error = %e, "model list failed");
                self.set_status_message(format!("⚠ Failed to load models: {}", e));
                self.models.failed(e.to_string());
            }
        }
    }

    pub fn handle_generated(&mut self, id: EntryId, result: Result<Option<String>>) {
        match result {
            Ok(text) => {
                let empty = text.is_none();
                if self.editor.generated(id, text) {
                    self.set_status_message("Generated text ready: Ctrl+Y apply, Ctrl+N discard".into());
                } else if empty {
                    self.set_status_message("Nothing generated".into());
                }
            }
            Err(e) => {
                self.editor.generated(id, None);
                tracing::error!(file = id, error = %e, "generation failed");
                self.set_status_message(format!("⚠ Generation failed: {}", e));
            }
        }
    }

    /// Periodic housekeeping: status expiry and autosave.
    pub fn tick(&mut self) {
        self.clear_expired_status();
        if let Some(interval) = self.autosave {
            if self.last_autosave.elapsed() >= interval {
                self.last_autosave = Instant::now();
                self.save_document();
            }
        }
    }

    // ── Tree interaction ───────────────────────────────────────────────

    /// Click the node under the cursor.
    pub fn activate_selected(&mut self) {
        if let Some(Activation::Selected(id)) = self.tree_state.activate_cursor() {
            self.engine.selection().set(Some(id));
        }
    }

    pub fn open_menu_on_cursor(&mut self) {
        if let Some(key) = self.tree_state.cursor_node().map(|item| item.key) {
            self.tree_state.open_menu(key);
        }
    }

    /// Run the highlighted menu action.
    pub fn choose_menu_action(&mut self) {
        let Some((node, action)) = self.tree_state.take_menu_choice() else {
            return;
        };
        match action {
            MenuAction::CreateFile => self.modal.open_create(NodeKind::File, Some(node.key.id())),
            MenuAction::CreateDirectory => {
                self.modal
                    .open_create(NodeKind::Directory, Some(node.key.id()))
            }
            MenuAction::Edit => self.modal.open_edit(node),
            MenuAction::Delete => self.modal.open_delete(node),
        }
    }

    pub fn create_at_root(&mut self, kind: NodeKind) {
        self.modal.open_create(kind, None);
    }

    pub fn edit_cursor_node(&mut self) {
        if let Some(node) = self.cursor_ref() {
            self.modal.open_edit(node);
        }
    }

    pub fn delete_cursor_node(&mut self) {
        if let Some(node) = self.cursor_ref() {
            self.modal.open_delete(node);
        }
    }

    fn cursor_ref(&self) -> Option<node::NodeRef> {
        let key = self.tree_state.cursor_node()?.key;
        self.tree_state.node_ref(key)
    }

    // ── Modal ──────────────────────────────────────────────────────────

    /// Confirm the modal; it closes and the engine takes over.
    pub fn confirm_modal(&mut self) {
        if let Some(mutation) = self.modal.confirm() {
            self.dispatch(mutation);
        }
    }

    pub fn decline_modal(&mut self) {
        if self.modal.mode() == Some(ModalMode::ConfirmDelete) {
            if let Some(mutation) = self.modal.decline() {
                self.dispatch(mutation);
            }
        } else {
            self.modal.cancel();
        }
    }

    // ── Document ───────────────────────────────────────────────────────

    pub fn focus_document(&mut self) {
        if self.editor.document.is_some() {
            self.focus = Focus::Document;
        }
    }

    pub fn focus_tree(&mut self) {
        self.focus = Focus::Tree;
    }

    fn load_document(&self, id: EntryId) {
        let documents = self.documents.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = documents.load(id).await;
            let _ = tx.send(Event::DocumentLoaded { id, result });
        });
    }

    /// Queue a save behind any still in flight, so saves land in order.
    /// A snapshot identical to the one still in flight is not sent twice.
    fn queue_save(&mut self, request: SaveRequest) {
        if self.last_queued.as_ref() == Some(&request) {
            return;
        }
        self.last_queued = Some(request.clone());

        let previous = self.save_chain.take();
        let documents = self.documents.clone();
        let tx = self.events.clone();
        self.save_chain = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let result = documents.save(&request).await;
            let _ = tx.send(Event::DocumentSaved {
                id: request.id,
                revision: request.revision,
                result,
            });
        }));
    }

    /// Save the open document if it has unsaved edits.
    pub fn save_document(&mut self) {
        if let Some(request) = self.editor.save_request() {
            self.queue_save(request);
        }
    }

    pub fn open_prompt(&mut self) {
        if self.editor.document.is_some() {
            self.editor.prompt = Some(InputField::default());
        }
    }

    pub fn close_prompt(&mut self) {
        self.editor.prompt = None;
    }

    /// Send the prompt to the generator. The context is the summary of the
    /// directory holding the file.
    pub fn submit_prompt(&mut self) {
        let Some(prompt) = self.editor.prompt.take() else {
            return;
        };
        let Some(id) = self.editor.document.as_ref().map(|d| d.id) else {
            return;
        };
        let context = node::parent_of(&self.tree_state.roots, NodeKey::File(id))
            .map(|dir| dir.summary.clone())
            .unwrap_or_default();

        let request = match self.editor.generation_request(
            &prompt.value,
            &context,
            self.models.selected(),
            self.is_authenticated(),
        ) {
                Ok(request) => request,
                Err(reason) => {
                    self.set_status_message(format!("⚠ Cannot generate: {}", reason));
                    return;
                }
            };

        self.editor.generating = true;
        let documents = self.documents.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = documents.generate(&request).await;
            let _ = tx.send(Event::Generated { id, result });
        });
    }

    pub fn apply_generated(&mut self) {
        if let Some(request) = self.editor.apply_generated() {
            self.queue_save(request);
        }
    }

    pub fn discard_generated(&mut self) {
        self.editor.discard_generated();
    }

    // ── Models ─────────────────────────────────────────────────────────

    /// Fetch the model list in the background. Skipped while signed out.
    pub fn request_models(&mut self) {
        if !self.is_authenticated() {
            return;
        }
        self.models.start_loading();
        let documents = self.documents.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = documents.models().await;
            let _ = tx.send(Event::ModelsLoaded(result));
        });
    }

    pub fn open_model_picker(&mut self) {
        if !self.is_authenticated() {
            self.set_status_message("⚠ Not signed in".into());
            return;
        }
        if self.models.models.is_empty() && !self.models.loading {
            self.request_models();
        }
        self.models.open();
    }

    pub fn choose_model(&mut self) {
        if let Some(name) = self.models.choose() {
            tracing::info!(model = %name, "model selected");
            self.set_status_message(format!("Model: {}", name));
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Let queued saves finish, save what is still dirty, then stop the
    /// engine from publishing late results.
    pub async fn shutdown(&mut self) {
        if let Some(pending) = self.save_chain.take() {
            let _ = pending.await;
        }
        if let Some(request) = self.editor.save_request() {
            if let Err(e) = self.documents.save(&request).await {
                tracing::error!(file = request.id, error = %e, "final save failed");
            }
        }
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::credentials::CredentialStore;
    use crate::models::SharedModel;
    use crate::remote::fake::{Call, FakeGateway};
    use crate::remote::generate::{DisabledGenerator, GenerationRequest, Generator};
    use crate::tree::selection::SelectionBroadcaster;

    struct Harness {
        app: App,
        gw: Arc<FakeGateway>,
        rx: mpsc::UnboundedReceiver<Event>,
    }

    fn harness_with(
        gw: FakeGateway,
        token: Option<&str>,
        generator: Arc<dyn Generator>,
    ) -> Harness {
        let gw = Arc::new(gw);
        let credentials = CredentialStore::new(token.map(String::from));
        let engine = TreeEngine::new(gw.clone(), credentials.clone(), SelectionBroadcaster::new());
        let documents = DocumentService::new(gw.clone(), generator, credentials);
        let (tx, rx) = mpsc::unbounded_channel();
        let models = ModelPicker::new(SharedModel::new(), None);
        let app = App::new(engine, documents, tx, models, None, true);
        Harness { app, gw, rx }
    }

    fn harness(gw: FakeGateway) -> Harness {
        harness_with(gw, Some("t"), Arc::new(DisabledGenerator))
    }

    /// Wait for the next event `pick` accepts, dropping the others.
    async fn next_event<T>(h: &mut Harness, pick: impl Fn(Event) -> Option<T>) -> T {
        loop {
            let event = h.rx.recv().await.expect("event channel open");
            if let Some(found) = pick(event) {
                return found;
            }
        }
    }

    async fn open_document(h: &mut Harness, file: EntryId) {
        h.app.handle_selection_changed(Some(file));
        let (id, result) = next_event(h, |e| match e {
            Event::DocumentLoaded { id, result } => Some((id, result)),
            _ => None,
        })
        .await;
        h.app.handle_document_loaded(id, result);
    }

    #[derive(Default)]
    struct RecordingGenerator {
        requests: parking_lot::Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait::async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(
            &self,
            _token: &str,
            request: &GenerationRequest,
        ) -> Result<Option<String>> {
            self.requests.lock().push(request.clone());
            Ok(Some(" more".into()))
        }
    }

    async fn load_tree(h: &mut Harness) {
        let roots = h.app.engine.resync().await;
        h.app.handle_tree_replaced(roots);
    }

    #[tokio::test]
    async fn activating_file_broadcasts_selection_once() {
        let mut h = harness(FakeGateway::new().with_file(1, "a.txt", None));
        load_tree(&mut h).await;
        let mut rx = h.app.engine.selection().subscribe();

        h.app.activate_selected();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        h.app.activate_selected();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn selection_change_loads_document() {
        let mut h = harness(
            FakeGateway::new()
                .with_file(1, "a.txt", None)
                .with_content(1, "hello"),
        );
        h.app.handle_selection_changed(Some(1));
        match h.rx.recv().await {
            Some(Event::DocumentLoaded { id, result }) => {
                h.app.handle_document_loaded(id, result);
            }
            other => panic!("unexpected {other:?}"),
        }
        let doc = h.app.editor.document.as_ref().unwrap();
        assert_eq!(doc.name, "a.txt");
        assert_eq!(doc.buffer.text(), "hello");
    }

    #[tokio::test]
    async fn menu_create_under_directory_dispatches_to_engine() {
        let mut h = harness(FakeGateway::new().with_dir(7, "Drafts", None));
        load_tree(&mut h).await;

        h.app.open_menu_on_cursor();
        h.app.choose_menu_action();
        assert_eq!(h.app.modal.mode(), Some(ModalMode::CreateFile));
        for c in "v2.txt".chars() {
            h.app.modal.focused_mut().unwrap().insert(c);
        }
        h.app.confirm_modal();
        assert!(!h.app.modal.is_open());

        match h.rx.recv().await {
            Some(Event::MutationDone(outcome)) => assert_eq!(outcome, MutationOutcome::Applied),
            other => panic!("unexpected {other:?}"),
        }
        assert!(h.gw.calls().contains(&Call::CreateFile {
            name: "v2.txt".into(),
            dir: Some(7),
        }));
    }

    #[tokio::test]
    async fn declined_delete_sends_no_delete() {
        let mut h = harness(FakeGateway::new().with_file(10, "f.txt", None));
        load_tree(&mut h).await;

        h.app.delete_cursor_node();
        assert_eq!(h.app.modal.mode(), Some(ModalMode::ConfirmDelete));
        h.app.decline_modal();
        match h.rx.recv().await {
            Some(Event::MutationDone(outcome)) => assert_eq!(outcome, MutationOutcome::Skipped),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.gw.count(|c| matches!(c, Call::DeleteFile(_))), 0);
        assert_eq!(h.app.tree_state.flat_items.len(), 1);
    }

    #[tokio::test]
    async fn report_becomes_status_message() {
        let mut h = harness(FakeGateway::new());
        h.app.handle_report(SyncError::DirectoryFetch {
            name: "B".into(),
            cause: "boom".into(),
        });
        let (msg, _) = h.app.status_message.as_ref().unwrap();
        assert!(msg.contains("failed to load directory B"));
    }

    #[tokio::test]
    async fn expired_status_is_cleared() {
        let mut h = harness(FakeGateway::new());
        h.app.status_message = Some(("old".into(), Instant::now() - Duration::from_secs(10)));
        h.app.tick();
        assert!(h.app.status_message.is_none());
    }

    #[tokio::test]
    async fn shutdown_saves_dirty_document() {
        let mut h = harness(
            FakeGateway::new()
                .with_file(1, "a.txt", None)
                .with_content(1, "hello"),
        );
        h.app.handle_selection_changed(Some(1));
        if let Some(Event::DocumentLoaded { id, result }) = h.rx.recv().await {
            h.app.handle_document_loaded(id, result);
        }
        h.app
            .editor
            .document
            .as_mut()
            .unwrap()
            .buffer
            .insert_char('>');

        h.app.shutdown().await;
        assert_eq!(h.gw.content_of(1).as_deref(), Some(">hello"));
        assert!(h.app.engine.is_closed());
    }

    #[tokio::test]
    async fn prompt_without_document_text_is_rejected() {
        let mut h = harness(FakeGateway::new().with_file(1, "a.txt", None));
        h.app.handle_selection_changed(Some(1));
        if let Some(Event::DocumentLoaded { id, result }) = h.rx.recv().await {
            h.app.handle_document_loaded(id, result);
        }
        h.app.open_prompt();
        h.app.editor.prompt.as_mut().unwrap().insert('x');
        h.app.submit_prompt();
        assert!(!h.app.editor.generating);
        let (msg, _) = h.app.status_message.as_ref().unwrap();
        assert!(msg.contains("document is empty"));
    }

    #[tokio::test]
    async fn reload_credentials_signs_in_and_resyncs() {
        std::env::remove_var(crate::remote::credentials::TOKEN_ENV);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let gw = Arc::new(FakeGateway::new().with_file(1, "a.txt", None));
        let credentials = CredentialStore::resolve(None, Some(&path));
        let engine = TreeEngine::new(gw.clone(), credentials.clone(), SelectionBroadcaster::new());
        let documents = DocumentService::new(gw.clone(), Arc::new(DisabledGenerator), credentials);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(engine, documents, tx, ModelPicker::default(), None, false);
        let mut trees = app.engine.subscribe_tree();

        app.reload_credentials();
        assert!(!app.is_authenticated());
        assert!(app.status_message.as_ref().unwrap().0.starts_with('⚠'));

        std::fs::write(&path, "tok\n").unwrap();
        app.reload_credentials();
        assert!(app.is_authenticated());
        assert_eq!(app.status_message.as_ref().unwrap().0, "Signed in");

        trees.changed().await.unwrap();
        assert_eq!(trees.borrow().len(), 1);
        assert_eq!(gw.root_fetches(), 1);
    }

    #[tokio::test]
    async fn switching_files_saves_unsaved_edits() {
        let mut h = harness(
            FakeGateway::new()
                .with_file(1, "a.txt", None)
                .with_content(1, "hello")
                .with_file(2, "b.txt", None),
        );
        open_document(&mut h, 1).await;
        h.app
            .editor
            .document
            .as_mut()
            .unwrap()
            .buffer
            .insert_char('>');

        h.app.handle_selection_changed(Some(2));
        assert_eq!(h.app.editor.current(), Some(2));
        h.app.shutdown().await;
        assert_eq!(h.gw.content_of(1).as_deref(), Some(">hello"));
    }

    #[tokio::test]
    async fn cleared_selection_saves_before_closing() {
        let mut h = harness(
            FakeGateway::new()
                .with_file(1, "a.txt", None)
                .with_content(1, "hello"),
        );
        open_document(&mut h, 1).await;
        h.app.editor.document.as_mut().unwrap().buffer.move_end();
        h.app.editor.document.as_mut().unwrap().buffer.insert_char('!');

        h.app.handle_selection_changed(None);
        assert!(h.app.editor.document.is_none());
        let (id, revision, result) = next_event(&mut h, |e| match e {
            Event::DocumentSaved {
                id,
                revision,
                result,
            } => Some((id, revision, result)),
            _ => None,
        })
        .await;
        h.app.handle_document_saved(id, revision, result);
        assert_eq!(h.gw.content_of(1).as_deref(), Some("hello!"));
    }

    #[tokio::test]
    async fn identical_save_is_queued_once() {
        let mut h = harness(
            FakeGateway::new()
                .with_file(1, "a.txt", None)
                .with_content(1, "hello"),
        );
        open_document(&mut h, 1).await;
        h.app.editor.document.as_mut().unwrap().buffer.insert_char('>');

        h.app.save_document();
        h.app.save_document();
        let (id, revision, result) = next_event(&mut h, |e| match e {
            Event::DocumentSaved {
                id,
                revision,
                result,
            } => Some((id, revision, result)),
            _ => None,
        })
        .await;
        h.app.handle_document_saved(id, revision, result);

        assert_eq!(h.gw.count(|c| matches!(c, Call::SaveContent { .. })), 1);
        assert!(!h.app.editor.document.as_ref().unwrap().is_dirty());
    }

    #[tokio::test]
    async fn first_model_is_selected_after_fetch() {
        let mut h = harness(FakeGateway::new().with_models(&["Llama3", "Gemma"]));
        h.app.request_models();
        assert!(h.app.models.loading);
        let result = next_event(&mut h, |e| match e {
            Event::ModelsLoaded(result) => Some(result),
            _ => None,
        })
        .await;
        h.app.handle_models_loaded(result);

        assert_eq!(h.app.models.models, vec!["Llama3", "Gemma"]);
        assert_eq!(h.app.models.selected().as_deref(), Some("Llama3"));
    }

    #[tokio::test]
    async fn model_fetch_failure_is_shown() {
        let mut h = harness(FakeGateway::new());
        h.gw.fail_models(true);
        h.app.request_models();
        let result = next_event(&mut h, |e| match e {
            Event::ModelsLoaded(result) => Some(result),
            _ => None,
        })
        .await;
        h.app.handle_models_loaded(result);

        assert!(h.app.models.error.is_some());
        assert!(!h.app.models.loading);
        let (msg, _) = h.app.status_message.as_ref().unwrap();
        assert!(msg.starts_with("⚠ Failed to load models"));
    }

    #[tokio::test]
    async fn models_are_not_fetched_while_signed_out() {
        let mut h = harness_with(
            FakeGateway::new().with_models(&["Llama3"]),
            None,
            Arc::new(DisabledGenerator),
        );
        h.app.request_models();
        assert!(!h.app.models.loading);
        h.app.open_model_picker();
        assert!(!h.app.models.open);
        tokio::task::yield_now().await;
        assert_eq!(h.gw.count(|c| *c == Call::ListModels), 0);
    }

    #[tokio::test]
    async fn chosen_model_is_sent_with_generation() {
        let generator = Arc::new(RecordingGenerator::default());
        let mut h = harness_with(
            FakeGateway::new()
                .with_models(&["Llama3", "Gemma"])
                .with_file(1, "a.txt", None)
                .with_content(1, "Once"),
            Some("t"),
            generator.clone(),
        );
        h.app.open_model_picker();
        assert!(h.app.models.open);
        let result = next_event(&mut h, |e| match e {
            Event::ModelsLoaded(result) => Some(result),
            _ => None,
        })
        .await;
        h.app.handle_models_loaded(result);
        h.app.models.next();
        h.app.choose_model();
        assert!(!h.app.models.open);
        assert_eq!(h.app.models.selected().as_deref(), Some("Gemma"));

        open_document(&mut h, 1).await;
        h.app.open_prompt();
        h.app.editor.prompt.as_mut().unwrap().insert('x');
        h.app.submit_prompt();
        let (id, result) = next_event(&mut h, |e| match e {
            Event::Generated { id, result } => Some((id, result)),
            _ => None,
        })
        .await;
        h.app.handle_generated(id, result);

        let requests = generator.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model.as_deref(), Some("Gemma"));
        assert_eq!(h.app.editor.pending.as_deref(), Some(" more"));
    }
}
