//! The document editor behind the selection.
//!
//! [`DocumentService`] does the I/O; [`DocumentEditor`] is the UI-side state
//! and decides which results still apply.

use std::sync::Arc;

use thiserror::Error;

use crate::error::Result;
use crate::modal::InputField;
use crate::remote::credentials::CredentialStore;
use crate::remote::generate::{GenerationRequest, Generator};
use crate::remote::{Gateway, ModelInfo};
use crate::tree::node::EntryId;

/// Line buffer with a char-column cursor.
#[derive(Debug, Clone)]
pub struct DocumentBuffer {
    pub lines: Vec<String>,
    pub cursor_line: usize,
    pub cursor_col: usize,
    pub scroll_offset: usize,
    /// Visible height of the editor area (set during render).
    pub visible_height: usize,
    /// Bumped on every edit; lets a finished save tell whether it is current.
    revision: u64,
    /// `"\r\n"` when the loaded text used CRLF, so saving keeps it.
    line_ending: &'static str,
}

impl DocumentBuffer {
    pub fn new(content: &str) -> Self {
        let line_ending = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let mut lines: Vec<String> = content.lines().map(String::from).collect();
        // Keep a trailing newline round-tripping as an empty last line.
        if lines.is_empty() || content.ends_with('\n') {
            lines.push(String::new());
        }
        Self {
            lines,
            cursor_line: 0,
            cursor_col: 0,
            scroll_offset: 0,
            visible_height: 24,
            revision: 0,
            line_ending,
        }
    }

    pub fn text(&self) -> String {
        self.lines.join(self.line_ending)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn current_line_len(&self) -> usize {
        self.lines
            .get(self.cursor_line)
            .map(|l| l.chars().count())
            .unwrap_or(0)
    }

    fn clamp_cursor(&mut self) {
        if self.cursor_line >= self.lines.len() {
            self.cursor_line = self.lines.len().saturating_sub(1);
        }
        self.cursor_col = self.cursor_col.min(self.current_line_len());
    }

    /// Scroll so the cursor stays inside the viewport.
    pub fn ensure_cursor_visible(&mut self) {
        if self.visible_height == 0 {
            return;
        }
        if self.cursor_line < self.scroll_offset {
            self.scroll_offset = self.cursor_line;
        } else if self.cursor_line >= self.scroll_offset + self.visible_height {
            self.scroll_offset = self.cursor_line + 1 - self.visible_height;
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        if let Some(line) = self.lines.get_mut(self.cursor_line) {
            let idx = char_to_byte_index(line, self.cursor_col);
            line.insert(idx, ch);
            self.cursor_col += 1;
            self.touch();
        }
    }

    /// Backspace; joins with the previous line at column 0.
    pub fn delete_char_before(&mut self) {
        if self.cursor_col > 0 {
            let line = &mut self.lines[self.cursor_line];
            let idx = char_to_byte_index(line, self.cursor_col - 1);
            line.remove(idx);
            self.cursor_col -= 1;
            self.touch();
        } else if self.cursor_line > 0 {
            let current = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            self.cursor_col = self.current_line_len();
            self.lines[self.cursor_line].push_str(&current);
            self.touch();
            self.ensure_cursor_visible();
        }
    }

    /// Delete key; joins the next line at end of line.
    pub fn delete_char_at(&mut self) {
        if self.cursor_col < self.current_line_len() {
            let line = &mut self.lines[self.cursor_line];
            let idx = char_to_byte_index(line, self.cursor_col);
            line.remove(idx);
            self.touch();
        } else if self.cursor_line + 1 < self.lines.len() {
            let next = self.lines.remove(self.cursor_line + 1);
            self.lines[self.cursor_line].push_str(&next);
            self.touch();
        }
    }

    pub fn insert_newline(&mut self) {
        let line = &mut self.lines[self.cursor_line];
        let idx = char_to_byte_index(line, self.cursor_col);
        let rest = line.split_off(idx);
        self.lines.insert(self.cursor_line + 1, rest);
        self.cursor_line += 1;
        self.cursor_col = 0;
        self.touch();
        self.ensure_cursor_visible();
    }

    /// Append text at the end of the document, moving the cursor there.
    pub fn append(&mut self, text: &str) {
        let mut pieces = text.split('\n').map(|p| p.strip_suffix('\r').unwrap_or(p));
        if let (Some(first), Some(last)) = (pieces.next(), self.lines.last_mut()) {
            last.push_str(first);
        }
        self.lines.extend(pieces.map(String::from));
        self.cursor_line = self.lines.len() - 1;
        self.cursor_col = self.current_line_len();
        self.touch();
        self.ensure_cursor_visible();
    }

    pub fn move_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.clamp_cursor();
            self.ensure_cursor_visible();
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.clamp_cursor();
            self.ensure_cursor_visible();
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.current_line_len();
            self.ensure_cursor_visible();
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor_col < self.current_line_len() {
            self.cursor_col += 1;
        } else if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = 0;
            self.ensure_cursor_visible();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_col = self.current_line_len();
    }
}

fn char_to_byte_index(s: &str, char_col: usize) -> usize {
    s.char_indices()
        .nth(char_col)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// A file's name and content as fetched from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub id: EntryId,
    pub name: String,
    pub content: String,
}

/// An open document.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: EntryId,
    pub name: String,
    pub buffer: DocumentBuffer,
    saved_revision: u64,
}

impl Document {
    pub fn is_dirty(&self) -> bool {
        self.buffer.revision() != self.saved_revision
    }
}

/// Why a generation request was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GenerateRejected {
    #[error("no document is open")]
    NoDocument,
    #[error("document is empty")]
    EmptyDocument,
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("not signed in")]
    NotAuthenticated,
}

/// A save to perform: file id, text snapshot and the revision it reflects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub id: EntryId,
    pub content: String,
    pub revision: u64,
}

/// UI-side editor state following the selection.
#[derive(Debug, Default)]
pub struct DocumentEditor {
    pub document: Option<Document>,
    /// File whose load is in flight.
    pub loading: Option<EntryId>,
    /// Prompt being typed for generation, if the prompt bar is open.
    pub prompt: Option<InputField>,
    /// Generated text awaiting apply or discard.
    pub pending: Option<String>,
    pub generating: bool,
}

impl DocumentEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The file this editor currently wants to show.
    pub fn current(&self) -> Option<EntryId> {
        self.loading.or(self.document.as_ref().map(|d| d.id))
    }

    /// Follow a selection change. Returns the id to load, if any. A
    /// cleared selection closes the document.
    pub fn follow(&mut self, selection: Option<EntryId>) -> Option<EntryId> {
        if selection == self.current() {
            return None;
        }
        self.document = None;
        self.prompt = None;
        self.pending = None;
        self.generating = false;
        self.loading = selection;
        selection
    }

    /// Install a loaded document unless the selection has moved on.
    pub fn loaded(&mut self, loaded: LoadedDocument) -> bool {
        if self.loading != Some(loaded.id) {
            tracing::debug!(file = loaded.id, "dropping stale document load");
            return false;
        }
        self.loading = None;
        self.document = Some(Document {
            id: loaded.id,
            name: loaded.name,
            buffer: DocumentBuffer::new(&loaded.content),
            saved_revision: 0,
        });
        true
    }

    /// A failed load leaves nothing open.
    pub fn load_failed(&mut self, id: EntryId) {
        if self.loading == Some(id) {
            self.loading = None;
        }
    }

    /// Snapshot for a save, if the document has unsaved edits.
    pub fn save_request(&self) -> Option<SaveRequest> {
        let doc = self.document.as_ref().filter(|d| d.is_dirty())?;
        Some(SaveRequest {
            id: doc.id,
            content: doc.buffer.text(),
            revision: doc.buffer.revision(),
        })
    }

    /// Record a finished save. Edits made while it was in flight stay dirty.
    pub fn saved(&mut self, id: EntryId, revision: u64) {
        if let Some(doc) = self.document.as_mut().filter(|d| d.id == id) {
            doc.saved_revision = doc.saved_revision.max(revision);
        }
    }

    /// Build a generation request from the prompt bar.
    pub fn generation_request(
        &self,
        prompt: &str,
        context: &str,
        model: Option<String>,
        authenticated: bool,
    ) -> std::result::Result<GenerationRequest, GenerateRejected> {
        let doc = self.document.as_ref().ok_or(GenerateRejected::NoDocument)?;
        if doc.buffer.is_empty() {
            return Err(GenerateRejected::EmptyDocument);
        }
        if prompt.trim().is_empty() {
            return Err(GenerateRejected::EmptyPrompt);
        }
        if !authenticated {
            return Err(GenerateRejected::NotAuthenticated);
        }
        Ok(GenerationRequest {
            id: doc.id,
            user_query: prompt.trim().to_string(),
            context: context.to_string(),
            text: doc.buffer.text(),
            model,
        })
    }

    /// Hold generated text for `id` unless another file is open now.
    pub fn generated(&mut self, id: EntryId, text: Option<String>) -> bool {
        self.generating = false;
        if self.document.as_ref().map(|d| d.id) != Some(id) {
            return false;
        }
        self.pending = text;
        self.pending.is_some()
    }

    /// Append the pending text to the document. Returns the save to run.
    pub fn apply_generated(&mut self) -> Option<SaveRequest> {
        let text = self.pending.take()?;
        let doc = self.document.as_mut()?;
        doc.buffer.append(&text);
        self.save_request()
    }

    pub fn discard_generated(&mut self) {
        self.pending = None;
    }
}

/// Document I/O against the workspace server.
#[derive(Clone)]
pub struct DocumentService {
    gateway: Arc<dyn Gateway>,
    generator: Arc<dyn Generator>,
    credentials: CredentialStore,
}

impl DocumentService {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        generator: Arc<dyn Generator>,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            gateway,
            generator,
            credentials,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    /// Re-read the token file; true when a new token was picked up.
    pub fn reload_credentials(&self) -> bool {
        self.credentials.reload()
    }

    /// Fetch name and content together. `None` without a credential.
    pub async fn load(&self, id: EntryId) -> Result<Option<LoadedDocument>> {
        let Some(token) = self.credentials.token() else {
            return Ok(None);
        };
        let (info, content) = tokio::try_join!(
            self.gateway.file_info(&token, id),
            self.gateway.file_content(&token, id),
        )?;
        Ok(Some(LoadedDocument {
            id,
            name: info.name.unwrap_or_default(),
            content,
        }))
    }

    /// Store the content. `false` if there was no credential to do it with.
    pub async fn save(&self, request: &SaveRequest) -> Result<bool> {
        let Some(token) = self.credentials.token() else {
            return Ok(false);
        };
        self.gateway
            .save_file_content(&token, request.id, &request.content)
            .await?;
        tracing::debug!(file = request.id, bytes = request.content.len(), "document saved");
        Ok(true)
    }

    /// Models offered by the server. `None` without a credential; no
    /// request is made then.
    pub async fn models(&self) -> Result<Option<Vec<ModelInfo>>> {
        let Some(token) = self.credentials.token() else {
            return Ok(None);
        };
        self.gateway.list_models(&token).await.map(Some)
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>> {
        let Some(token) = self.credentials.token() else {
            return Ok(None);
        };
        self.generator.generate(&token, request).await
    }
}
