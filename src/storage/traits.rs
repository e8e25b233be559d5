//! Storage trait definitions

use crate::graph::{Iri, MetadataGraph, Term, Triple};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The shared graph holding every content item's derived metadata
///
/// Implementations must be thread-safe (Send + Sync): the pipeline's
/// worker mutates the store while hosts may read it concurrently.
/// Query results are returned as owned collections, never as live
/// cursors, so callers can mutate the store while holding them.
pub trait MetadataStore: Send + Sync {
    /// Subjects of all statements `(?s, relation, object)`
    fn subjects_with(&self, relation: &Iri, object: &Term) -> StoreResult<Vec<Term>>;

    /// Every statement whose subject is `subject`
    fn statements_with_subject(&self, subject: &Term) -> StoreResult<Vec<Triple>>;

    /// Every statement whose object is `object`
    fn statements_with_object(&self, object: &Term) -> StoreResult<Vec<Triple>>;

    /// Delete every statement whose subject is `subject`.
    /// Returns the number of statements removed.
    fn delete_statements_with_subject(&self, subject: &Term) -> StoreResult<usize>;

    /// Insert all statements of `graph`. Statements already present are
    /// not duplicated. Returns the number of statements newly added.
    fn add_all(&self, graph: &MetadataGraph) -> StoreResult<usize>;

    /// Delete every statement about `node` and about each of `subjects`,
    /// then insert `graph`, as one write. On error nothing is changed.
    ///
    /// Returns `(removed, added)` statement counts.
    fn replace_subgraph(
        &self,
        node: &Term,
        subjects: &[Term],
        graph: &MetadataGraph,
    ) -> StoreResult<(usize, usize)>;

    /// Total number of statements
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of every statement in the store
    fn triples(&self) -> StoreResult<MetadataGraph>;
}

/// Reject statements a graph store cannot hold
pub(crate) fn validate(triple: &Triple) -> StoreResult<()> {
    if !triple.subject.is_resource() {
        return Err(StoreError::InvalidStatement(format!(
            "literal in subject position: {}",
            triple
        )));
    }
    Ok(())
}

/// Extension trait for opening stores from paths
pub trait OpenStore: MetadataStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StoreResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StoreResult<Self>;
}
