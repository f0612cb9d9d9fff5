//! Per-node serialization of mutations.
//!
//! Two mutations touching the same node (or, for creates, the same parent)
//! run one after the other; unrelated mutations proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::tree::node::NodeKey;

/// What a mutation locks on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockTarget {
    /// Creations at the root level.
    Root,
    Node(NodeKey),
}

/// Lazily populated map of per-target async locks.
#[derive(Default)]
pub struct MutationLocks {
    locks: Mutex<HashMap<LockTarget, Arc<AsyncMutex<()>>>>,
}

impl MutationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, target: LockTarget) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(target)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `target`. The lock is released when the
    /// guard drops.
    pub async fn acquire(&self, target: LockTarget) -> OwnedMutexGuard<()> {
        self.lock_for(target).lock_owned().await
    }

    /// Drop entries nobody is holding or waiting on.
    pub fn prune(&self) {
        self.locks
            .lock()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}
