//! Enhancement engine trait: the external computation producing metadata

use crate::graph::{Iri, MetadataGraph};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// One content item handed to an engine
///
/// Built per processing attempt and dropped right after the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Canonical URI of the node the content was read from
    pub uri: Iri,
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl ContentItem {
    pub fn new(uri: Iri, data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            uri,
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// Errors from engine invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("engine rejected content: {0}")]
    Rejected(String),
    #[error("engine produced invalid output: {0}")]
    InvalidOutput(String),
    #[error("engine timed out after {0:?}")]
    Timeout(Duration),
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client trait for the enrichment engine.
///
/// Abstracts over transport (subprocess, in-process, mock) so the
/// pipeline doesn't depend on how enrichment is computed.
#[async_trait]
pub trait EnhancementEngine: Send + Sync {
    /// Compute metadata for one content item.
    ///
    /// The returned graph should link every enhancement it describes to
    /// `item.uri` through the extracted-from relation; statements not
    /// reachable that way are not replaced on the next enrichment.
    async fn enhance(&self, item: &ContentItem) -> Result<MetadataGraph, EngineError>;
}
