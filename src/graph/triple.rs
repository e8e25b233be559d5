//! Statements and the metadata graph an enrichment produces

use super::term::{Iri, Term};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single (subject, predicate, object) statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Iri,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<Term>, predicate: impl Into<Iri>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}

/// A set of statements
///
/// Duplicate statements collapse. Iteration order is the natural
/// ordering of triples, so two graphs with the same statements always
/// iterate identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataGraph {
    triples: BTreeSet<Triple>,
}

impl MetadataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement. Returns false if it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Builder-style insert
    pub fn with(mut self, triple: Triple) -> Self {
        self.triples.insert(triple);
        self
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Subjects of statements `(?s, relation, object)`
    pub fn subjects_with(&self, relation: &Iri, object: &Term) -> BTreeSet<Term> {
        self.triples
            .iter()
            .filter(|t| &t.predicate == relation && &t.object == object)
            .map(|t| t.subject.clone())
            .collect()
    }
}

impl FromIterator<Triple> for MetadataGraph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: iter.into_iter().collect(),
        }
    }
}

impl Extend<Triple> for MetadataGraph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.triples.extend(iter);
    }
}

impl IntoIterator for MetadataGraph {
    type Item = Triple;
    type IntoIter = std::collections::btree_set::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetadataGraph {
    type Item = &'a Triple;
    type IntoIter = std::collections::btree_set::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}
