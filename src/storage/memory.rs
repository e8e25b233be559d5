//! Process-local metadata store

use super::traits::{validate, MetadataStore, StoreResult};
use crate::graph::{Iri, MetadataGraph, Term, Triple};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    /// Statements indexed by subject
    by_subject: HashMap<Term, BTreeSet<Triple>>,
    len: usize,
}

impl Inner {
    fn remove_subject(&mut self, subject: &Term) -> usize {
        let removed = self.by_subject.remove(subject).map(|t| t.len()).unwrap_or(0);
        self.len -= removed;
        removed
    }

    fn insert_all(&mut self, graph: &MetadataGraph) -> usize {
        let mut added = 0;
        for triple in graph {
            if self
                .by_subject
                .entry(triple.subject.clone())
                .or_default()
                .insert(triple.clone())
            {
                added += 1;
            }
        }
        self.len += added;
        added
    }
}

/// In-memory metadata store guarded by a read/write lock
///
/// Readers see each mutation either fully applied or not at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `graph`
    pub fn with_graph(graph: &MetadataGraph) -> StoreResult<Self> {
        let store = Self::new();
        store.add_all(graph)?;
        Ok(store)
    }
}

impl MetadataStore for MemoryStore {
    fn subjects_with(&self, relation: &Iri, object: &Term) -> StoreResult<Vec<Term>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .by_subject
            .iter()
            .filter(|(_, triples)| {
                triples
                    .iter()
                    .any(|t| &t.predicate == relation && &t.object == object)
            })
            .map(|(subject, _)| subject.clone())
            .collect())
    }

    fn statements_with_subject(&self, subject: &Term) -> StoreResult<Vec<Triple>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .by_subject
            .get(subject)
            .map(|triples| triples.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn statements_with_object(&self, object: &Term) -> StoreResult<Vec<Triple>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .by_subject
            .values()
            .flat_map(|triples| triples.iter().filter(|t| &t.object == object).cloned())
            .collect())
    }

    fn delete_statements_with_subject(&self, subject: &Term) -> StoreResult<usize> {
        Ok(self.inner.write().unwrap().remove_subject(subject))
    }

    fn add_all(&self, graph: &MetadataGraph) -> StoreResult<usize> {
        for triple in graph {
            validate(triple)?;
        }
        Ok(self.inner.write().unwrap().insert_all(graph))
    }

    fn replace_subgraph(
        &self,
        node: &Term,
        subjects: &[Term],
        graph: &MetadataGraph,
    ) -> StoreResult<(usize, usize)> {
        for triple in graph {
            validate(triple)?;
        }
        // One write guard: readers never see the node without metadata
        let mut inner = self.inner.write().unwrap();
        let mut removed = inner.remove_subject(node);
        for subject in subjects {
            removed += inner.remove_subject(subject);
        }
        let added = inner.insert_all(graph);
        Ok((removed, added))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.inner.read().unwrap().len)
    }

    fn triples(&self) -> StoreResult<MetadataGraph> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .by_subject
            .values()
            .flat_map(|triples| triples.iter().cloned())
            .collect())
    }
}
