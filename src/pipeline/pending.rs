//! Deduplicating set of nodes awaiting enrichment

use crate::repository::NodePath;
use std::collections::HashSet;
use std::sync::Mutex;

/// Result of `PendingSet::insert`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Newly added; `pending` is the set size after the insert
    Added { pending: usize },
    /// Already waiting for the next drain
    AlreadyPending,
}

/// An immutable snapshot of drained identities, in first-insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    nodes: Vec<NodePath>,
    generation: u64,
}

impl Batch {
    /// Which drain of its pending set produced this batch, counting from
    /// 1; 0 for batches built by hand
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodePath> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[NodePath] {
        &self.nodes
    }

    pub fn contains(&self, node: &NodePath) -> bool {
        self.nodes.contains(node)
    }
}

impl FromIterator<NodePath> for Batch {
    /// Duplicates keep their first position
    fn from_iter<I: IntoIterator<Item = NodePath>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        Self {
            nodes: iter.into_iter().filter(|n| seen.insert(n.clone())).collect(),
            generation: 0,
        }
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a NodePath;
    type IntoIter = std::slice::Iter<'a, NodePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[derive(Debug, Default)]
struct PendingState {
    order: Vec<NodePath>,
    members: HashSet<NodePath>,
    drains: u64,
}

/// Node identities waiting for the worker's next drain
///
/// `insert` and `drain_all` share one mutex, so a drain observes every
/// insert that completed before it and none that started after it: each
/// identity lands wholly in one batch.
#[derive(Debug, Default)]
pub struct PendingSet {
    state: Mutex<PendingState>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` unless it is already pending.
    pub fn insert(&self, node: NodePath) -> InsertOutcome {
        let mut state = self.state.lock().unwrap();
        if state.members.contains(&node) {
            return InsertOutcome::AlreadyPending;
        }
        state.members.insert(node.clone());
        state.order.push(node);
        InsertOutcome::Added {
            pending: state.order.len(),
        }
    }

    /// Atomically take every pending identity, leaving the set empty.
    pub fn drain_all(&self) -> Batch {
        let mut state = self.state.lock().unwrap();
        state.members.clear();
        state.drains += 1;
        Batch {
            nodes: std::mem::take(&mut state.order),
            generation: state.drains,
        }
    }

    /// Generation of the drain that will take everything pending now, or
    /// `None` if nothing is pending
    pub fn next_drain(&self) -> Option<u64> {
        let state = self.state.lock().unwrap();
        (!state.order.is_empty()).then_some(state.drains + 1)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
