//! Mock engine for testing: returns synthetic or preconfigured graphs.

use super::traits::{ContentItem, EngineError, EnhancementEngine};
use crate::graph::vocab::{extracted_from, ENHANCEMENT, RDF_TYPE};
use crate::graph::{Iri, MetadataGraph, Term, Triple};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Predicate carrying the byte length of the enhanced content
pub const MOCK_LENGTH: &str = "urn:loom:mock#length";
/// Predicate carrying the mime type the engine was handed
pub const MOCK_MIME_TYPE: &str = "urn:loom:mock#mimeType";

/// Mock engine.
///
/// Unless configured otherwise, each call yields one fresh enhancement
/// (a new IRI per call) linked to the item's URI and describing
/// its length and mime type, so consecutive enrichments of the same item
/// never share subjects.
pub struct MockEngine {
    responses: HashMap<Iri, MetadataGraph>,
    failures: HashMap<Iri, String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Iri>>,
    completed: Mutex<Vec<Iri>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            failures: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Return `graph` verbatim for `uri`.
    pub fn with_response(mut self, uri: impl Into<Iri>, graph: MetadataGraph) -> Self {
        self.responses.insert(uri.into(), graph);
        self
    }

    /// Reject `uri` with `EngineError::Rejected`.
    pub fn with_failure(mut self, uri: impl Into<Iri>, reason: impl Into<String>) -> Self {
        self.failures.insert(uri.into(), reason.into());
        self
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URIs of every call started, in order
    pub fn calls(&self) -> Vec<Iri> {
        self.calls.lock().unwrap().clone()
    }

    /// URIs of every call that ran to the end, in order
    pub fn completed(&self) -> Vec<Iri> {
        self.completed.lock().unwrap().clone()
    }

    fn synthesize(item: &ContentItem) -> MetadataGraph {
        let enhancement = Term::iri(format!("urn:enhancement-{}", Uuid::new_v4()));
        MetadataGraph::new()
            .with(Triple::new(enhancement.clone(), RDF_TYPE, Term::iri(ENHANCEMENT)))
            .with(Triple::new(
                enhancement.clone(),
                extracted_from(),
                Term::Iri(item.uri.clone()),
            ))
            .with(Triple::new(
                enhancement.clone(),
                MOCK_LENGTH,
                Term::typed_literal(
                    item.data.len().to_string(),
                    "http://www.w3.org/2001/XMLSchema#integer",
                ),
            ))
            .with(Triple::new(
                enhancement,
                MOCK_MIME_TYPE,
                Term::literal(item.mime_type.clone()),
            ))
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnhancementEngine for MockEngine {
    async fn enhance(&self, item: &ContentItem) -> Result<MetadataGraph, EngineError> {
        self.calls.lock().unwrap().push(item.uri.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self.failures.get(&item.uri) {
            Some(reason) => Err(EngineError::Rejected(reason.clone())),
            None => Ok(self
                .responses
                .get(&item.uri)
                .cloned()
                .unwrap_or_else(|| Self::synthesize(item))),
        };

        self.completed.lock().unwrap().push(item.uri.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(uri: &str) -> ContentItem {
        ContentItem::new(Iri::new(uri), b"hello".to_vec(), "text/plain")
    }

    #[tokio::test]
    async fn synthesized_graph_links_back_to_item() {
        let engine = MockEngine::new();
        let graph = engine.enhance(&item("urn:doc")).await.unwrap();

        let subjects = graph.subjects_with(&extracted_from(), &Term::iri("urn:doc"));
        assert_eq!(subjects.len(), 1);
        assert_eq!(graph.len(), 4);
        assert_eq!(engine.calls(), vec![Iri::new("urn:doc")]);
    }

    #[tokio::test]
    async fn consecutive_calls_use_fresh_subjects() {
        let engine = MockEngine::new();
        let first = engine.enhance(&item("urn:doc")).await.unwrap();
        let second = engine.enhance(&item("urn:doc")).await.unwrap();

        let s1 = first.subjects_with(&extracted_from(), &Term::iri("urn:doc"));
        let s2 = second.subjects_with(&extracted_from(), &Term::iri("urn:doc"));
        assert!(s1.is_disjoint(&s2));
    }

    #[tokio::test]
    async fn configured_failure_is_rejected() {
        let engine = MockEngine::new().with_failure("urn:bad", "unsupported format");
        let err = engine.enhance(&item("urn:bad")).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected(ref r) if r == "unsupported format"));
        assert_eq!(engine.completed(), vec![Iri::new("urn:bad")]);
    }

    #[tokio::test]
    async fn configured_response_is_returned_verbatim() {
        let graph = MetadataGraph::new().with(Triple::new(
            Term::iri("urn:e"),
            extracted_from(),
            Term::iri("urn:doc"),
        ));
        let engine = MockEngine::new().with_response("urn:doc", graph.clone());
        assert_eq!(engine.enhance(&item("urn:doc")).await.unwrap(), graph);
    }
}
