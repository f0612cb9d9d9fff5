//! Tree synchronization engine.
//!
//! Owns the authoritative workspace tree and rebuilds it from the server.
//! Mutations never patch the tree locally: a successful create, rename or
//! delete is always followed by a full resync, so what is shown is exactly
//! what the server reports.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use crate::error::{MutationOp, Result, SyncError};
use crate::remote::credentials::CredentialStore;
use crate::remote::{EntrySummary, Gateway, Listing};
use crate::tree::locks::{LockTarget, MutationLocks};
use crate::tree::node::{self, EntryId, Node, NodeKey, NodeKind, NodeRef};
use crate::tree::selection::SelectionBroadcaster;

/// Capacity of the report channel; slow subscribers lose the oldest reports.
const REPORT_CAPACITY: usize = 64;

/// A create, rename or delete captured by the modal, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingMutation {
    Create {
        kind: NodeKind,
        name: String,
        context: String,
        parent: Option<EntryId>,
    },
    Rename {
        node: NodeRef,
        name: String,
        context: Option<String>,
    },
    Delete {
        node: NodeRef,
        confirmed: bool,
    },
}

/// How a mutation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server accepted it and the tree was resynced.
    Applied,
    /// The call failed; the failure was reported and the tree is unchanged.
    Failed,
    /// Nothing was sent (declined confirmation or no credential).
    Skipped,
}

struct Inner {
    gateway: Arc<dyn Gateway>,
    credentials: CredentialStore,
    selection: SelectionBroadcaster,
    tree_tx: watch::Sender<Arc<Vec<Node>>>,
    reports: broadcast::Sender<SyncError>,
    locks: MutationLocks,
    next_seq: AtomicU64,
    published_seq: Mutex<u64>,
    closed: AtomicBool,
}

/// Handle to the tree engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TreeEngine {
    inner: Arc<Inner>,
}

impl TreeEngine {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        credentials: CredentialStore,
        selection: SelectionBroadcaster,
    ) -> Self {
        let (tree_tx, _) = watch::channel(Arc::new(Vec::new()));
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                gateway,
                credentials,
                selection,
                tree_tx,
                reports,
                locks: MutationLocks::new(),
                next_seq: AtomicU64::new(0),
                published_seq: Mutex::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The last published tree.
    pub fn tree(&self) -> Arc<Vec<Node>> {
        self.inner.tree_tx.borrow().clone()
    }

    /// Notified once per published tree.
    pub fn subscribe_tree(&self) -> watch::Receiver<Arc<Vec<Node>>> {
        self.inner.tree_tx.subscribe()
    }

    /// Failures observed while syncing or mutating.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<SyncError> {
        self.inner.reports.subscribe()
    }

    pub fn selection(&self) -> &SelectionBroadcaster {
        &self.inner.selection
    }

    /// Stop publishing results. In-flight calls are left to finish.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Rebuild the whole tree from the server and publish it.
    ///
    /// One root fetch, then every directory's content concurrently; all of
    /// them settle before anything is published. A failing directory is kept
    /// with no children. A failing root fetch publishes an empty tree.
    pub async fn resync(&self) -> Arc<Vec<Node>> {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(token) = self.inner.credentials.token() else {
            tracing::debug!("no credential, publishing empty workspace");
            self.publish(seq, Vec::new(), Some(&HashSet::new()));
            return self.tree();
        };

        match self.inner.gateway.fetch_root(&token).await {
            Ok(listing) => {
                let failed = Mutex::new(HashSet::new());
                let mut roots = self.build_level(&token, listing, Vec::new(), &failed).await;
                dedupe(&mut roots, &mut HashSet::new());
                let failed = failed.into_inner();
                tracing::info!(roots = roots.len(), failed_dirs = failed.len(), "workspace resynced");
                self.publish(seq, roots, Some(&failed));
            }
            Err(e) => {
                tracing::error!(error = %e, "root listing failed");
                self.report(SyncError::RootFetch {
                    cause: e.to_string(),
                });
                self.publish(seq, Vec::new(), None);
            }
        }
        self.tree()
    }

    /// Directories first (each fetched concurrently), then loose files, both
    /// in listing order.
    fn build_level<'a>(
        &'a self,
        token: &'a str,
        listing: Listing,
        ancestors: Vec<EntryId>,
        failed: &'a Mutex<HashSet<EntryId>>,
    ) -> BoxFuture<'a, Vec<Node>> {
        async move {
            let dirs = listing.dirs.into_iter().map(|(id, entry)| {
                self.build_directory(token, id, entry, ancestors.clone(), failed)
            });
            let mut nodes = join_all(dirs).await;
            nodes.extend(
                listing
                    .files
                    .into_iter()
                    .map(|(id, entry)| Node::file(id, entry.name)),
            );
            nodes
        }
        .boxed()
    }

    async fn build_directory(
        &self,
        token: &str,
        id: EntryId,
        entry: EntrySummary,
        mut ancestors: Vec<EntryId>,
        failed: &Mutex<HashSet<EntryId>>,
    ) -> Node {
        let summary = entry.summary.unwrap_or_default();
        if ancestors.contains(&id) {
            tracing::warn!(dir = %entry.name, id, "directory contains itself, not descending");
            return Node::directory(id, entry.name, summary, Vec::new());
        }

        let children = match self.inner.gateway.fetch_directory(token, id).await {
            Ok(listing) => {
                ancestors.push(id);
                self.build_level(token, listing, ancestors, failed).await
            }
            Err(e) => {
                failed.lock().insert(id);
                tracing::warn!(dir = %entry.name, id, error = %e, "directory listing failed");
                self.report(SyncError::DirectoryFetch {
                    name: entry.name.clone(),
                    cause: e.to_string(),
                });
                Vec::new()
            }
        };
        Node::directory(id, entry.name, summary, children)
    }

    /// Replace the published tree unless the engine is closed or a newer
    /// resync already published.
    ///
    /// With `prune_unless_under` set, a selected file missing from `roots` is
    /// deselected, except when it last sat under one of those directories:
    /// their listings failed this pass, so absence proves nothing.
    fn publish(
        &self,
        seq: u64,
        roots: Vec<Node>,
        prune_unless_under: Option<&HashSet<EntryId>>,
    ) -> bool {
        if self.is_closed() {
            tracing::debug!(seq, "engine closed, dropping resync result");
            return false;
        }
        let mut published = self.inner.published_seq.lock();
        if seq < *published {
            tracing::debug!(seq, newer = *published, "stale resync discarded");
            return false;
        }
        *published = seq;

        if let Some(failed) = prune_unless_under {
            if let Some(file) = self.inner.selection.get() {
                let key = NodeKey::File(file);
                if node::find(&roots, key).is_none() {
                    let previous = self.tree();
                    if node::ancestors(&previous, key)
                        .iter()
                        .any(|dir| failed.contains(dir))
                    {
                        tracing::debug!(file, "selected file unreachable this pass, kept");
                    } else {
                        tracing::debug!(file, "selected file no longer exists");
                        self.inner.selection.clear_if(file);
                    }
                }
            }
        }
        self.inner.tree_tx.send_replace(Arc::new(roots));
        true
    }

    fn report(&self, error: SyncError) {
        // No subscribers is fine; the failure is logged either way.
        let _ = self.inner.reports.send(error);
    }

    fn token_for(&self, op: MutationOp, target: &str) -> Option<String> {
        let token = self.inner.credentials.token();
        if token.is_none() {
            tracing::debug!(%op, node = target, "no credential, mutation skipped");
        }
        token
    }

    async fn finish(&self, op: MutationOp, target: &str, result: Result<()>) -> MutationOutcome {
        match result {
            Ok(()) => {
                tracing::info!(%op, node = target, "mutation applied");
                self.resync().await;
                MutationOutcome::Applied
            }
            Err(e) => {
                tracing::error!(%op, node = target, error = %e, "mutation failed");
                self.report(SyncError::Mutation {
                    op,
                    target: target.to_string(),
                    cause: e.to_string(),
                });
                MutationOutcome::Failed
            }
        }
    }

    /// Create a file or directory under `parent` (`None` = root).
    pub async fn create_node(
        &self,
        kind: NodeKind,
        name: &str,
        context: &str,
        parent: Option<EntryId>,
    ) -> MutationOutcome {
        let lock = match parent {
            Some(id) => LockTarget::Node(NodeKey::Directory(id)),
            None => LockTarget::Root,
        };
        let _guard = self.inner.locks.acquire(lock).await;
        let Some(token) = self.token_for(MutationOp::Create, name) else {
            return MutationOutcome::Skipped;
        };

        let gateway = &self.inner.gateway;
        let result = match kind {
            NodeKind::File => gateway.create_file(&token, name, parent).await.map(drop),
            NodeKind::Directory => gateway
                .create_directory(&token, name, context, parent)
                .await
                .map(drop),
        };
        self.finish(MutationOp::Create, name, result).await
    }

    /// Rename a node. Directories also take a new summary; when `context`
    /// is `None` the current one is kept. Files ignore `context`.
    pub async fn rename_node(
        &self,
        node: &NodeRef,
        name: &str,
        context: Option<&str>,
    ) -> MutationOutcome {
        let _guard = self.inner.locks.acquire(LockTarget::Node(node.key)).await;
        let Some(token) = self.token_for(MutationOp::Rename, &node.name) else {
            return MutationOutcome::Skipped;
        };

        let gateway = &self.inner.gateway;
        let result = match node.key {
            NodeKey::File(id) => gateway.edit_file(&token, id, name).await.map(drop),
            NodeKey::Directory(id) => {
                let summary = context.unwrap_or(&node.summary);
                gateway
                    .edit_directory(&token, id, name, summary)
                    .await
                    .map(drop)
            }
        };
        self.finish(MutationOp::Rename, &node.name, result).await
    }

    /// Delete a node once the user has confirmed. Declining sends nothing.
    ///
    /// If the selected file is removed (directly, or inside a deleted
    /// directory), the selection is cleared before the resync starts.
    pub async fn delete_node(&self, node: &NodeRef, confirmed: bool) -> MutationOutcome {
        if !confirmed {
            tracing::debug!(node = %node.name, "delete declined");
            return MutationOutcome::Skipped;
        }
        let _guard = self.inner.locks.acquire(LockTarget::Node(node.key)).await;
        let Some(token) = self.token_for(MutationOp::Delete, &node.name) else {
            return MutationOutcome::Skipped;
        };

        let gateway = &self.inner.gateway;
        let result = match node.key {
            NodeKey::File(id) => gateway.delete_file(&token, id).await,
            NodeKey::Directory(id) => gateway.delete_directory(&token, id).await,
        };
        if result.is_ok() {
            self.clear_selection_within(node.key);
        }
        let outcome = self.finish(MutationOp::Delete, &node.name, result).await;
        self.inner.locks.prune();
        outcome
    }

    fn clear_selection_within(&self, removed: NodeKey) {
        let Some(selected) = self.inner.selection.get() else {
            return;
        };
        let hit = match removed {
            NodeKey::File(id) => id == selected,
            NodeKey::Directory(_) => {
                let tree = self.tree();
                node::find(&tree, removed)
                    .and_then(Node::children)
                    .is_some_and(|children| node::find(children, NodeKey::File(selected)).is_some())
            }
        };
        if hit {
            self.inner.selection.clear_if(selected);
        }
    }

    /// Apply a mutation captured by the modal.
    pub async fn apply(&self, mutation: PendingMutation) -> MutationOutcome {
        match mutation {
            PendingMutation::Create {
                kind,
                name,
                context,
                parent,
            } => self.create_node(kind, &name, &context, parent).await,
            PendingMutation::Rename {
                node,
                name,
                context,
            } => self.rename_node(&node, &name, context.as_deref()).await,
            PendingMutation::Delete { node, confirmed } => {
                self.delete_node(&node, confirmed).await
            }
        }
    }
}

/// Drop nodes whose `(kind, id)` already appeared earlier in the tree.
fn dedupe(nodes: &mut Vec<Node>, seen: &mut HashSet<NodeKey>) {
    let mut kept = Vec::with_capacity(nodes.len());
    for mut n in nodes.drain(..) {
        if !seen.insert(n.key()) {
            tracing::warn!(key = ?n.key(), name = n.name(), "duplicate node dropped");
            continue;
        }
        if let Node::Directory(dir) = &mut n {
            dedupe(&mut dir.children, seen);
        }
        kept.push(n);
    }
    *nodes = kept;
}
