use std::collections::HashSet;
use std::sync::Arc;

use crate::tree::node::{self, EntryId, FlatNode, Node, NodeKey, NodeKind, NodeRef};

/// Entries of a node's action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    CreateFile,
    CreateDirectory,
    Edit,
    Delete,
}

impl MenuAction {
    /// Actions offered for a node of the given kind.
    pub fn for_kind(kind: NodeKind) -> &'static [MenuAction] {
        match kind {
            NodeKind::Directory => &[
                MenuAction::CreateFile,
                MenuAction::CreateDirectory,
                MenuAction::Edit,
                MenuAction::Delete,
            ],
            NodeKind::File => &[MenuAction::Edit, MenuAction::Delete],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::CreateFile => "New file",
            MenuAction::CreateDirectory => "New directory",
            MenuAction::Edit => "Edit",
            MenuAction::Delete => "Delete",
        }
    }
}

/// The single open action menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMenu {
    pub key: NodeKey,
    pub cursor: usize,
}

/// Result of activating a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// A directory was expanded or collapsed.
    Toggled,
    /// A different file became the selection; broadcast it.
    Selected(EntryId),
    /// The file was already selected.
    Unchanged,
}

/// State for the tree view.
///
/// Holds only interaction state: which directories are expanded, which
/// file is selected, where the cursor is, and which menu is open. The tree
/// itself is a read-only snapshot from the engine.
#[derive(Debug, Default)]
pub struct TreeState {
    pub roots: Arc<Vec<Node>>,
    pub flat_items: Vec<FlatNode>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    /// Expanded directories, keyed by identity so they survive a resync.
    expanded: HashSet<NodeKey>,
    selected_file: Option<EntryId>,
    pub menu: Option<OpenMenu>,
}

impl TreeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly published tree.
    ///
    /// Expansion and the cursor follow nodes by key. Keys that disappeared
    /// are forgotten, and a menu on a vanished node is closed.
    pub fn replace_tree(&mut self, roots: Arc<Vec<Node>>) {
        let cursor_key = self.cursor_node().map(|item| item.key);

        let mut present = HashSet::new();
        node::collect_keys(&roots, &mut present);
        self.expanded.retain(|key| present.contains(key));
        if let Some(menu) = &self.menu {
            if !present.contains(&menu.key) {
                self.menu = None;
            }
        }

        self.roots = roots;
        self.flatten();

        if let Some(index) = cursor_key.and_then(|key| self.index_of(key)) {
            self.selected_index = index;
        }
    }

    /// Rebuild `flat_items` from the current tree and expansion set.
    pub fn flatten(&mut self) {
        self.flat_items = node::flatten(&self.roots, &self.expanded);
        if self.flat_items.is_empty() {
            self.selected_index = 0;
        } else if self.selected_index >= self.flat_items.len() {
            self.selected_index = self.flat_items.len() - 1;
        }
    }

    pub fn index_of(&self, key: NodeKey) -> Option<usize> {
        self.flat_items.iter().position(|item| item.key == key)
    }

    pub fn cursor_node(&self) -> Option<&FlatNode> {
        self.flat_items.get(self.selected_index)
    }

    /// Detached copy of a node in the current tree.
    pub fn node_ref(&self, key: NodeKey) -> Option<NodeRef> {
        node::find(&self.roots, key).map(Node::to_ref)
    }

    pub fn is_expanded(&self, key: NodeKey) -> bool {
        self.expanded.contains(&key)
    }

    /// Expand a collapsed directory or collapse an expanded one. Files are
    /// ignored.
    pub fn toggle_expanded(&mut self, key: NodeKey) {
        if key.kind() != NodeKind::Directory {
            return;
        }
        if !self.expanded.remove(&key) {
            self.expanded.insert(key);
        }
        self.flatten();
    }

    /// Click semantics: directories toggle, files select.
    ///
    /// Re-activating the selected file is a no-op rather than a deselect.
    pub fn activate(&mut self, key: NodeKey) -> Activation {
        match key {
            NodeKey::Directory(_) => {
                self.toggle_expanded(key);
                Activation::Toggled
            }
            NodeKey::File(id) if self.selected_file == Some(id) => Activation::Unchanged,
            NodeKey::File(id) => {
                self.selected_file = Some(id);
                Activation::Selected(id)
            }
        }
    }

    /// Activate the node under the cursor.
    pub fn activate_cursor(&mut self) -> Option<Activation> {
        let key = self.cursor_node()?.key;
        Some(self.activate(key))
    }

    /// Mirror a selection change made elsewhere (deletes, the editor).
    pub fn sync_selection(&mut self, file: Option<EntryId>) {
        self.selected_file = file;
    }

    pub fn selected_file(&self) -> Option<EntryId> {
        self.selected_file
    }

    /// Visual selection compares identity pairs, never positions.
    pub fn is_selected(&self, key: NodeKey) -> bool {
        matches!((key, self.selected_file), (NodeKey::File(id), Some(sel)) if id == sel)
    }

    /// Open `key`'s action menu, replacing any other open menu.
    pub fn open_menu(&mut self, key: NodeKey) {
        self.menu = Some(OpenMenu { key, cursor: 0 });
    }

    pub fn close_menu(&mut self) {
        self.menu = None;
    }

    pub fn is_menu_open(&self, key: NodeKey) -> bool {
        self.menu.as_ref().is_some_and(|menu| menu.key == key)
    }

    pub fn menu_actions(&self) -> &'static [MenuAction] {
        match &self.menu {
            Some(menu) => MenuAction::for_kind(menu.key.kind()),
            None => &[],
        }
    }

    pub fn menu_next(&mut self) {
        let len = self.menu_actions().len();
        if let Some(menu) = &mut self.menu {
            if menu.cursor + 1 < len {
                menu.cursor += 1;
            }
        }
    }

    pub fn menu_previous(&mut self) {
        if let Some(menu) = &mut self.menu {
            menu.cursor = menu.cursor.saturating_sub(1);
        }
    }

    /// Take the highlighted menu action and close the menu.
    pub fn take_menu_choice(&mut self) -> Option<(NodeRef, MenuAction)> {
        let actions = self.menu_actions();
        let menu = self.menu.take()?;
        let action = *actions.get(menu.cursor)?;
        Some((self.node_ref(menu.key)?, action))
    }

    /// Move the cursor down by one item.
    pub fn select_next(&mut self) {
        let len = self.flat_items.len();
        if len > 0 && self.selected_index < len - 1 {
            self.selected_index += 1;
        }
    }

    /// Move the cursor up by one item.
    pub fn select_previous(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        let len = self.flat_items.len();
        if len > 0 {
            self.selected_index = len - 1;
        }
    }

    /// Update the scroll offset to ensure the cursor is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::selection::SelectionBroadcaster;

    fn sample() -> Arc<Vec<Node>> {
        Arc::new(vec![
            Node::directory(1, "A", "alpha", vec![Node::file(3, "x.txt")]),
            Node::directory(2, "B", "", vec![]),
            Node::file(1, "loose.md"),
        ])
    }

    fn state() -> TreeState {
        let mut state = TreeState::new();
        state.replace_tree(sample());
        state
    }

    fn names(state: &TreeState) -> Vec<&str> {
        state.flat_items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn directories_start_collapsed() {
        let state = state();
        assert_eq!(names(&state), vec!["A", "B", "loose.md"]);
        assert!(!state.is_expanded(NodeKey::Directory(1)));
    }

    #[test]
    fn toggle_is_idempotent_per_click() {
        let mut state = state();
        let a = NodeKey::Directory(1);
        assert_eq!(state.activate(a), Activation::Toggled);
        assert_eq!(names(&state), vec!["A", "x.txt", "B", "loose.md"]);
        state.activate(a);
        assert_eq!(names(&state), vec!["A", "B", "loose.md"]);
        state.activate(a);
        assert!(state.is_expanded(a));
    }

    #[test]
    fn expansion_survives_resync_with_same_ids() {
        let mut state = state();
        state.toggle_expanded(NodeKey::Directory(1));

        // A fresh tree with new node objects but the same ids.
        state.replace_tree(sample());
        assert!(state.is_expanded(NodeKey::Directory(1)));
        assert_eq!(names(&state), vec!["A", "x.txt", "B", "loose.md"]);
    }

    #[test]
    fn expansion_of_vanished_directory_is_forgotten() {
        let mut state = state();
        state.toggle_expanded(NodeKey::Directory(2));
        state.replace_tree(Arc::new(vec![Node::file(1, "loose.md")]));
        state.replace_tree(sample());
        assert!(!state.is_expanded(NodeKey::Directory(2)));
    }

    #[test]
    fn toggling_a_file_does_nothing() {
        let mut state = state();
        state.toggle_expanded(NodeKey::File(1));
        assert!(!state.is_expanded(NodeKey::File(1)));
        assert!(!state.is_expanded(NodeKey::Directory(1)));
    }

    #[test]
    fn reselecting_selected_file_notifies_once() {
        let mut state = state();
        let selection = SelectionBroadcaster::new();
        let mut rx = selection.subscribe();

        for _ in 0..2 {
            if let Activation::Selected(id) = state.activate(NodeKey::File(1)) {
                selection.set(Some(id));
            }
        }
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        assert_eq!(state.activate(NodeKey::File(1)), Activation::Unchanged);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(selection.get(), Some(1));
    }

    #[test]
    fn directory_click_never_touches_selection() {
        let mut state = state();
        state.activate(NodeKey::File(3));
        state.activate(NodeKey::Directory(1));
        assert_eq!(state.selected_file(), Some(3));
    }

    #[test]
    fn visual_selection_compares_kind_and_id() {
        let mut state = state();
        state.sync_selection(Some(1));
        assert!(state.is_selected(NodeKey::File(1)));
        assert!(!state.is_selected(NodeKey::Directory(1)));
    }

    #[test]
    fn only_one_menu_open_at_a_time() {
        let mut state = state();
        state.open_menu(NodeKey::Directory(1));
        state.open_menu(NodeKey::File(1));
        assert!(state.is_menu_open(NodeKey::File(1)));
        assert!(!state.is_menu_open(NodeKey::Directory(1)));
        assert_eq!(state.menu_actions(), &[MenuAction::Edit, MenuAction::Delete]);
    }

    #[test]
    fn menu_choice_returns_node_and_closes() {
        let mut state = state();
        state.open_menu(NodeKey::Directory(1));
        state.menu_next();
        let (node, action) = state.take_menu_choice().unwrap();
        assert_eq!(action, MenuAction::CreateDirectory);
        assert_eq!(node.key, NodeKey::Directory(1));
        assert_eq!(node.summary, "alpha");
        assert!(state.menu.is_none());
    }

    #[test]
    fn menu_cursor_is_clamped() {
        let mut state = state();
        state.open_menu(NodeKey::File(1));
        state.menu_previous();
        for _ in 0..5 {
            state.menu_next();
        }
        assert_eq!(state.take_menu_choice().unwrap().1, MenuAction::Delete);
    }

    #[test]
    fn menu_on_vanished_node_closes() {
        let mut state = state();
        state.open_menu(NodeKey::Directory(2));
        state.replace_tree(Arc::new(vec![Node::file(1, "loose.md")]));
        assert!(state.menu.is_none());
    }

    #[test]
    fn cursor_follows_node_across_resync() {
        let mut state = state();
        state.selected_index = 1; // B
        state.replace_tree(Arc::new(vec![
            Node::directory(9, "New", "", vec![]),
            Node::directory(1, "A", "", vec![]),
            Node::directory(2, "B", "", vec![]),
        ]));
        assert_eq!(state.cursor_node().unwrap().key, NodeKey::Directory(2));
    }

    #[test]
    fn cursor_clamps_when_tree_shrinks() {
        let mut state = state();
        state.select_last();
        state.replace_tree(Arc::new(vec![Node::directory(1, "A", "", vec![])]));
        assert_eq!(state.selected_index, 0);
        state.replace_tree(Arc::new(Vec::new()));
        assert!(state.cursor_node().is_none());
    }

    #[test]
    fn select_next_and_previous_clamp() {
        let mut state = state();
        state.select_previous();
        assert_eq!(state.selected_index, 0);
        for _ in 0..10 {
            state.select_next();
        }
        assert_eq!(state.selected_index, 2);
        state.select_first();
        assert_eq!(state.selected_index, 0);
    }

    #[test]
    fn update_scroll_keeps_cursor_visible() {
        let mut state = state();
        state.select_last();
        state.update_scroll(2);
        assert_eq!(state.scroll_offset, 1);
        state.select_first();
        state.update_scroll(2);
        assert_eq!(state.scroll_offset, 0);
    }
}
