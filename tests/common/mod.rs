//! Common test utilities for pipeline integration tests
//!
//! Wires an `EnrichmentPipeline` to an in-memory repository, a mock
//! engine, and a caller-chosen store.

#![allow(dead_code)]

use loom::graph::vocab::extracted_from;
use loom::pipeline::content_uri;
use loom::{
    EnrichmentPipeline, MemoryRepository, MemoryStore, MetadataStore, MockEngine, NodePath,
    PipelineConfig, Term,
};
use std::sync::Arc;

pub const URI_PREFIX: &str = "urn:loom:content";

pub fn path(p: &str) -> NodePath {
    NodePath::parse(p).unwrap()
}

pub fn uri(node: &str) -> Term {
    Term::Iri(content_uri(URI_PREFIX, &path(node)))
}

/// Config with the given quiet window and defaults otherwise
pub fn config(quiet_window_ms: u64) -> PipelineConfig {
    PipelineConfig {
        quiet_window_ms,
        ..Default::default()
    }
}

pub struct Harness {
    pub repo: Arc<MemoryRepository>,
    pub engine: Arc<MockEngine>,
    pub store: Arc<dyn MetadataStore>,
    pub pipeline: EnrichmentPipeline,
}

impl Harness {
    pub async fn start(config: PipelineConfig, engine: MockEngine) -> Self {
        Self::start_with_store(config, engine, Arc::new(MemoryStore::new())).await
    }

    pub async fn start_with_store(
        config: PipelineConfig,
        engine: MockEngine,
        store: Arc<dyn MetadataStore>,
    ) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let engine = Arc::new(engine);
        let pipeline =
            EnrichmentPipeline::start(config, repo.clone(), engine.clone(), store.clone())
                .await
                .unwrap();
        Self {
            repo,
            engine,
            store,
            pipeline,
        }
    }

    pub fn write(&self, node: &str, data: &str) {
        self.repo.put_file(&path(node), data, Some("text/plain"));
    }

    /// Subjects currently linked to `node` through extracted-from
    pub fn enhancements_of(&self, node: &str) -> Vec<Term> {
        self.store.subjects_with(&extracted_from(), &uri(node)).unwrap()
    }
}
