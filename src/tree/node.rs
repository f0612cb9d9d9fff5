use std::collections::HashSet;

/// Server-assigned identifier. Directory and file ids live in separate
/// namespaces, so an id alone does not identify a node.
pub type EntryId = u64;

/// The kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
        }
    }
}

/// Identity of a node: the `(kind, id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKey {
    File(EntryId),
    Directory(EntryId),
}

impl NodeKey {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeKey::File(_) => NodeKind::File,
            NodeKey::Directory(_) => NodeKind::Directory,
        }
    }

    pub fn id(&self) -> EntryId {
        match self {
            NodeKey::File(id) | NodeKey::Directory(id) => *id,
        }
    }
}

/// A directory and the files (and possibly directories) it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub id: EntryId,
    pub name: String,
    /// Free-form context text attached to the directory.
    pub summary: String,
    pub children: Vec<Node>,
}

/// A document leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub id: EntryId,
    pub name: String,
}

/// A node in the workspace tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Directory(Directory),
    File(File),
}

impl Node {
    pub fn file(id: EntryId, name: impl Into<String>) -> Self {
        Node::File(File {
            id,
            name: name.into(),
        })
    }

    pub fn directory(
        id: EntryId,
        name: impl Into<String>,
        summary: impl Into<String>,
        children: Vec<Node>,
    ) -> Self {
        Node::Directory(Directory {
            id,
            name: name.into(),
            summary: summary.into(),
            children,
        })
    }

    pub fn key(&self) -> NodeKey {
        match self {
            Node::Directory(d) => NodeKey::Directory(d.id),
            Node::File(f) => NodeKey::File(f.id),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.key().kind()
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Directory(d) => &d.name,
            Node::File(f) => &f.name,
        }
    }

    /// Children of a directory; `None` for files.
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Directory(d) => Some(&d.children),
            Node::File(_) => None,
        }
    }

    /// Detached description of this node, suitable for mutation requests.
    pub fn to_ref(&self) -> NodeRef {
        NodeRef {
            key: self.key(),
            name: self.name().to_string(),
            summary: match self {
                Node::Directory(d) => d.summary.clone(),
                Node::File(_) => String::new(),
            },
        }
    }
}

/// A node detached from the tree, used as the target of edits and deletes.
///
/// Nodes are recreated on every resync, so anything that outlives a resync
/// refers to them by value rather than by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub key: NodeKey,
    pub name: String,
    pub summary: String,
}

/// A flattened representation of a tree node for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNode {
    pub key: NodeKey,
    pub name: String,
    /// Depth from the implicit root; root-level nodes are level 0.
    pub level: usize,
    pub is_expanded: bool,
    pub is_last_sibling: bool,
}

impl FlatNode {
    pub fn kind(&self) -> NodeKind {
        self.key.kind()
    }
}

/// Depth-first flattening of `roots`, descending only into directories whose
/// key is in `expanded`.
pub fn flatten(roots: &[Node], expanded: &HashSet<NodeKey>) -> Vec<FlatNode> {
    let mut items = Vec::new();
    flatten_level(roots, expanded, 0, &mut items);
    items
}

fn flatten_level(
    nodes: &[Node],
    expanded: &HashSet<NodeKey>,
    level: usize,
    items: &mut Vec<FlatNode>,
) {
    for (i, node) in nodes.iter().enumerate() {
        let key = node.key();
        let is_expanded = matches!(node, Node::Directory(_)) && expanded.contains(&key);
        items.push(FlatNode {
            key,
            name: node.name().to_string(),
            level,
            is_expanded,
            is_last_sibling: i == nodes.len() - 1,
        });
        if is_expanded {
            if let Some(children) = node.children() {
                flatten_level(children, expanded, level + 1, items);
            }
        }
    }
}

/// Find a node anywhere in the tree by key.
pub fn find<'a>(nodes: &'a [Node], key: NodeKey) -> Option<&'a Node> {
    for node in nodes {
        if node.key() == key {
            return Some(node);
        }
        if let Some(found) = node.children().and_then(|c| find(c, key)) {
            return Some(found);
        }
    }
    None
}

/// Find the directory directly containing `key`. `None` for root-level
/// nodes and for keys not in the tree.
pub fn parent_of(nodes: &[Node], key: NodeKey) -> Option<&Directory> {
    for node in nodes {
        if let Node::Directory(dir) = node {
            if dir.children.iter().any(|c| c.key() == key) {
                return Some(dir);
            }
            if let Some(found) = parent_of(&dir.children, key) {
                return Some(found);
            }
        }
    }
    None
}

/// Ids of the directories enclosing `key`, outermost first. Empty for
/// root-level nodes and for keys not in the tree.
pub fn ancestors(nodes: &[Node], key: NodeKey) -> Vec<EntryId> {
    fn walk(nodes: &[Node], key: NodeKey, path: &mut Vec<EntryId>) -> bool {
        for node in nodes {
            if node.key() == key {
                return true;
            }
            if let Node::Directory(dir) = node {
                path.push(dir.id);
                if walk(&dir.children, key, path) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    let mut path = Vec::new();
    if walk(nodes, key, &mut path) {
        path
    } else {
        Vec::new()
    }
}

/// Collect every key reachable from `nodes`.
pub fn collect_keys(nodes: &[Node], out: &mut HashSet<NodeKey>) {
    for node in nodes {
        out.insert(node.key());
        if let Some(children) = node.children() {
            collect_keys(children, out);
        }
    }
}
