//! The one reusable input surface for create, edit and delete flows.

use crate::tree::node::{EntryId, NodeKey, NodeKind, NodeRef};
use crate::tree::sync::PendingMutation;

/// What the modal is being used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    CreateFile,
    CreateDirectory,
    EditFile,
    EditDirectory,
    ConfirmDelete,
}

impl ModalMode {
    pub fn title(&self) -> &'static str {
        match self {
            ModalMode::CreateFile => "New File",
            ModalMode::CreateDirectory => "New Directory",
            ModalMode::EditFile => "Rename File",
            ModalMode::EditDirectory => "Edit Directory",
            ModalMode::ConfirmDelete => "Confirm Delete",
        }
    }

    /// Whether the mode has a context (directory summary) field.
    pub fn has_context(&self) -> bool {
        matches!(self, ModalMode::CreateDirectory | ModalMode::EditDirectory)
    }
}

/// Where the modal's result applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalTarget {
    /// Creates: the parent directory, `None` for the root.
    Parent(Option<EntryId>),
    /// Edits and deletes: the node itself.
    Node(NodeRef),
}

/// A single-line text input with a byte-offset cursor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
}

impl InputField {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    /// Insert a character at the cursor.
    pub fn insert(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn backspace(&mut self) {
        if let Some(prev) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= prev.len_utf8();
            self.value.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= prev.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.value[self.cursor..].chars().next() {
            self.cursor += next.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.len();
    }
}

/// Which input has focus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ModalField {
    #[default]
    Name,
    Context,
}

/// Modal state: `Closed`, or `Open` with a mode, a target and fresh inputs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum ModalState {
    #[default]
    Closed,
    Open {
        mode: ModalMode,
        target: ModalTarget,
        name: InputField,
        context: InputField,
        focus: ModalField,
    },
}

/// Drives the modal and turns a confirmed modal into a [`PendingMutation`].
///
/// The coordinator never talks to the server; the caller hands the
/// mutation to the engine.
#[derive(Debug, Default)]
pub struct ModalCoordinator {
    pub state: ModalState,
}

impl ModalCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, ModalState::Closed)
    }

    pub fn mode(&self) -> Option<ModalMode> {
        match &self.state {
            ModalState::Open { mode, .. } => Some(*mode),
            ModalState::Closed => None,
        }
    }

    fn open(&mut self, mode: ModalMode, target: ModalTarget, name: &str, context: &str) {
        self.state = ModalState::Open {
            mode,
            target,
            name: InputField::with_value(name),
            context: InputField::with_value(context),
            focus: ModalField::Name,
        };
    }

    /// Open a create flow under `parent` (`None` = root) with empty inputs.
    pub fn open_create(&mut self, kind: NodeKind, parent: Option<EntryId>) {
        let mode = match kind {
            NodeKind::File => ModalMode::CreateFile,
            NodeKind::Directory => ModalMode::CreateDirectory,
        };
        self.open(mode, ModalTarget::Parent(parent), "", "");
    }

    /// Open an edit flow prefilled with the node's current name and summary.
    pub fn open_edit(&mut self, node: NodeRef) {
        let mode = match node.key {
            NodeKey::File(_) => ModalMode::EditFile,
            NodeKey::Directory(_) => ModalMode::EditDirectory,
        };
        let (name, context) = (node.name.clone(), node.summary.clone());
        self.open(mode, ModalTarget::Node(node), &name, &context);
    }

    pub fn open_delete(&mut self, node: NodeRef) {
        self.open(ModalMode::ConfirmDelete, ModalTarget::Node(node), "", "");
    }

    /// The focused input, if the mode has inputs.
    pub fn focused_mut(&mut self) -> Option<&mut InputField> {
        match &mut self.state {
            ModalState::Open {
                mode: ModalMode::ConfirmDelete,
                ..
            }
            | ModalState::Closed => None,
            ModalState::Open {
                name,
                context,
                focus,
                ..
            } => Some(match focus {
                ModalField::Name => name,
                ModalField::Context => context,
            }),
        }
    }

    /// Switch between name and context (directories only).
    pub fn toggle_focus(&mut self) {
        if let ModalState::Open { mode, focus, .. } = &mut self.state {
            if mode.has_context() {
                *focus = match focus {
                    ModalField::Name => ModalField::Context,
                    ModalField::Context => ModalField::Name,
                };
            }
        }
    }

    /// Confirm the modal.
    ///
    /// An empty name keeps the modal open and yields nothing. Otherwise the
    /// modal closes and the mutation is returned for the engine.
    pub fn confirm(&mut self) -> Option<PendingMutation> {
        let ModalState::Open {
            mode,
            target,
            name,
            context,
            ..
        } = &self.state
        else {
            return None;
        };
        let name = name.value.trim().to_string();
        if *mode != ModalMode::ConfirmDelete && name.is_empty() {
            return None;
        }
        let context = context.value.clone();

        let mutation = match (*mode, target.clone()) {
            (ModalMode::CreateFile, ModalTarget::Parent(parent)) => PendingMutation::Create {
                kind: NodeKind::File,
                name,
                context: String::new(),
                parent,
            },
            (ModalMode::CreateDirectory, ModalTarget::Parent(parent)) => {
                PendingMutation::Create {
                    kind: NodeKind::Directory,
                    name,
                    context,
                    parent,
                }
            }
            (ModalMode::EditFile, ModalTarget::Node(node)) => PendingMutation::Rename {
                node,
                name,
                context: None,
            },
            (ModalMode::EditDirectory, ModalTarget::Node(node)) => PendingMutation::Rename {
                node,
                name,
                context: Some(context),
            },
            (ModalMode::ConfirmDelete, ModalTarget::Node(node)) => PendingMutation::Delete {
                node,
                confirmed: true,
            },
            (mode, target) => {
                tracing::warn!(?mode, modal_target = ?target, "modal target does not match mode");
                self.close();
                return None;
            }
        };
        self.close();
        Some(mutation)
    }

    /// Decline a delete confirmation. The declined delete is returned so the
    /// engine can record it; nothing is sent to the server.
    pub fn decline(&mut self) -> Option<PendingMutation> {
        let mutation = match &self.state {
            ModalState::Open {
                mode: ModalMode::ConfirmDelete,
                target: ModalTarget::Node(node),
                ..
            } => Some(PendingMutation::Delete {
                node: node.clone(),
                confirmed: false,
            }),
            _ => None,
        };
        self.close();
        mutation
    }

    /// Close without side effects, discarding input.
    pub fn cancel(&mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.state = ModalState::Closed;
    }
}
