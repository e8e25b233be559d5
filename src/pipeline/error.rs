//! Pipeline error types

use super::config::ConfigError;
use crate::enhancer::EngineError;
use crate::repository::RepositoryError;
use crate::storage::StoreError;
use thiserror::Error;

/// Why a change event did not make a node pending
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed event path: {0}")]
    Malformed(String),
    #[error("cannot resolve {path}: {source}")]
    Unresolvable {
        path: String,
        #[source]
        source: RepositoryError,
    },
}

/// Failure processing a single node. Never escapes the node's own step.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("engine: {0}")]
    Engine(#[from] EngineError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("worker task failed: {0}")]
    Task(String),
}

/// Errors affecting the pipeline as a whole
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("subscription failed: {0}")]
    Subscription(#[from] RepositoryError),
    #[error("worker terminated abnormally: {0}")]
    Worker(String),
}

/// Result type for pipeline lifecycle operations
pub type PipelineResult<T> = Result<T, PipelineError>;
