//! Swaps a node's derived metadata for a freshly computed graph
//!
//! The protocol, in order:
//!
//! 1. collect the subjects linked to the node URI through extracted-from
//! 2. walk the blank nodes hanging off those subjects and the node URI
//! 3. snapshot all of them before touching the store
//! 4. in one store write, delete every statement about the node URI and
//!    each collected subject, then insert the new graph
//!
//! The store applies step 4 atomically, so a failed replace leaves the
//! previous metadata in place. Replaces of one URI never interleave.
//!
//! Blank node labels only mean something inside one engine response.
//! Before insertion they are rewritten under a fresh per-replace scope so
//! two enrichments that both say `_:b1` never share a node.

use crate::graph::vocab::extracted_from;
use crate::graph::{Iri, MetadataGraph, Term, Triple};
use crate::storage::{validate, MetadataStore, StoreError, StoreResult};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Counts from one replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Enhancements previously linked to the node
    pub subjects_removed: usize,
    /// Blank nodes reached from the node or its enhancements
    pub blank_nodes_removed: usize,
    pub statements_removed: usize,
    pub statements_added: usize,
    /// Store size once the replace committed
    pub accumulated: usize,
}

pub struct MetadataReplacer {
    store: Arc<dyn MetadataStore>,
    locks: DashMap<Iri, Arc<Mutex<()>>>,
}

impl MetadataReplacer {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Replace everything previously derived from `uri` with `graph`.
    ///
    /// An invalid graph is rejected before anything is deleted. Store
    /// access runs on the blocking pool.
    pub async fn replace(&self, uri: &Iri, graph: &MetadataGraph) -> StoreResult<ReplaceOutcome> {
        for triple in graph {
            validate(triple)?;
        }
        let graph = scope_blank_nodes(graph, &Uuid::new_v4().simple().to_string());

        let lock = self
            .locks
            .entry(uri.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let outcome = {
            let _guard = lock.lock().await;
            let store = self.store.clone();
            let node = Term::Iri(uri.clone());
            tokio::task::spawn_blocking(move || replace_subgraph(store.as_ref(), &node, &graph))
                .await
                .map_err(|e| StoreError::Task(e.to_string()))
                .and_then(|result| result)
        };

        drop(lock);
        self.locks.remove_if(uri, |_, l| Arc::strong_count(l) == 1);

        let outcome = outcome?;
        info!(
            %uri,
            removed = outcome.statements_removed,
            added = outcome.statements_added,
            accumulated = outcome.accumulated,
            "replaced metadata"
        );
        Ok(outcome)
    }
}

fn replace_subgraph(
    store: &dyn MetadataStore,
    node: &Term,
    graph: &MetadataGraph,
) -> StoreResult<ReplaceOutcome> {
    // Materialise before deleting; the store must not be mutated while
    // a query over it is still being read.
    let enhancements: BTreeSet<Term> = store
        .subjects_with(&extracted_from(), node)?
        .into_iter()
        .filter(|s| s != node)
        .collect();
    let blank_nodes = blank_context(store, node, &enhancements)?;

    let subjects: Vec<Term> = enhancements.iter().chain(&blank_nodes).cloned().collect();
    let (removed, added) = store.replace_subgraph(node, &subjects, graph)?;

    debug!(
        %node,
        enhancements = enhancements.len(),
        blank_nodes = blank_nodes.len(),
        "prior enhancements removed"
    );
    Ok(ReplaceOutcome {
        subjects_removed: enhancements.len(),
        blank_nodes_removed: blank_nodes.len(),
        statements_removed: removed,
        statements_added: added,
        accumulated: store.len()?,
    })
}

/// Blank nodes reachable from `node` or any of `enhancements`.
///
/// From the node URI only outgoing statements are followed; statements
/// of other nodes may point at it. Enhancements and blank nodes belong
/// to this node alone, so both directions are followed from them.
fn blank_context(
    store: &dyn MetadataStore,
    node: &Term,
    enhancements: &BTreeSet<Term>,
) -> StoreResult<BTreeSet<Term>> {
    let mut found = BTreeSet::new();
    let mut frontier: Vec<Term> = enhancements.iter().cloned().collect();
    for object in store.statements_with_subject(node)?.into_iter().map(|t| t.object) {
        if matches!(object, Term::Blank(_)) && found.insert(object.clone()) {
            frontier.push(object);
        }
    }

    while let Some(term) = frontier.pop() {
        let outgoing = store.statements_with_subject(&term)?.into_iter().map(|t| t.object);
        let incoming = store.statements_with_object(&term)?.into_iter().map(|t| t.subject);
        for next in outgoing.chain(incoming) {
            if matches!(next, Term::Blank(_))
                && !enhancements.contains(&next)
                && found.insert(next.clone())
            {
                frontier.push(next);
            }
        }
    }
    Ok(found)
}

fn scope_blank_nodes(graph: &MetadataGraph, scope: &str) -> MetadataGraph {
    let relabel = |term: &Term| match term {
        Term::Blank(id) => Term::Blank(format!("{}.{}", scope, id)),
        other => other.clone(),
    };
    graph
        .iter()
        .map(|t| Triple {
            subject: relabel(&t.subject),
            predicate: t.predicate.clone(),
            object: relabel(&t.object),
        })
        .collect()
}
