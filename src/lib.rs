//! Loom: change-driven content enrichment
//!
//! Watches a hierarchical content repository, and whenever a node's
//! payload changes, runs an enhancement engine over the new content and
//! replaces the node's derived metadata in a shared graph store.
//!
//! # Core Concepts
//!
//! - **Nodes**: content items addressed by absolute paths (`/docs/a.txt`)
//! - **Batches**: bursts of changes coalesced by a quiet window, each node once
//! - **Enhancements**: metadata subgraphs linked to their node by `extracted-from`
//!
//! # Example
//!
//! ```no_run
//! use loom::{EnrichmentPipeline, MemoryRepository, MemoryStore, MockEngine, PipelineConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> loom::PipelineResult<()> {
//! let pipeline = EnrichmentPipeline::start(
//!     PipelineConfig::default(),
//!     Arc::new(MemoryRepository::new()),
//!     Arc::new(MockEngine::new()),
//!     Arc::new(MemoryStore::new()),
//! )
//! .await?;
//! // ... content changes are enriched in the background ...
//! pipeline.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod enhancer;
pub mod graph;
pub mod pipeline;
pub mod repository;
pub mod storage;

pub use enhancer::{CommandEngine, ContentItem, EngineError, EnhancementEngine, MockEngine};
pub use graph::{Iri, Literal, MetadataGraph, Term, Triple};
pub use pipeline::{
    BatchReport, CancellationToken, EnrichmentPipeline, IngestSummary, PipelineConfig,
    PipelineError, PipelineResult, ProcessError,
};
pub use repository::{
    ChangeListener, ContentRepository, EventKind, FsRepository, MemoryRepository, NodePath,
    RawEvent, RepositoryError,
};
pub use storage::{MemoryStore, MetadataStore, OpenStore, SqliteStore, StoreError, StoreResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
