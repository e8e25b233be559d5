//! Turns a pending node into a content item and runs the engine on it

use super::error::ProcessError;
use crate::enhancer::{ContentItem, EnhancementEngine};
use crate::graph::{Iri, MetadataGraph};
use crate::repository::{ContentRepository, NodePath};
use std::sync::Arc;
use tracing::debug;

pub struct EnhancementInvoker {
    repository: Arc<dyn ContentRepository>,
    engine: Arc<dyn EnhancementEngine>,
    uri_prefix: String,
    default_mime_type: String,
}

impl EnhancementInvoker {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        engine: Arc<dyn EnhancementEngine>,
        uri_prefix: impl Into<String>,
        default_mime_type: impl Into<String>,
    ) -> Self {
        let uri_prefix: String = uri_prefix.into();
        Self {
            repository,
            engine,
            uri_prefix: uri_prefix.trim_end_matches('/').to_string(),
            default_mime_type: default_mime_type.into(),
        }
    }

    /// Canonical URI of a node: the prefix followed by the node path
    pub fn content_uri(&self, node: &NodePath) -> Iri {
        content_uri(&self.uri_prefix, node)
    }

    /// Read `node` and enrich its current content.
    ///
    /// Returns the node's canonical URI together with the engine output.
    /// The content item is dropped as soon as the engine returns.
    pub async fn invoke(&self, node: &NodePath) -> Result<(Iri, MetadataGraph), ProcessError> {
        let content = self.repository.read(node).await?;
        let mime_type = content
            .mime_type
            .unwrap_or_else(|| self.default_mime_type.clone());

        let uri = self.content_uri(node);
        let item = ContentItem::new(uri.clone(), content.data, mime_type);
        debug!(%node, mime_type = %item.mime_type, bytes = item.data.len(), "invoking engine");

        let graph = self.engine.enhance(&item).await?;
        Ok((uri, graph))
    }
}

/// Canonical URI for `node` under `prefix`
pub fn content_uri(prefix: &str, node: &NodePath) -> Iri {
    let prefix = prefix.trim_end_matches('/');
    if node.is_root() {
        Iri::new(format!("{}/", prefix))
    } else {
        Iri::new(format!("{}{}", prefix, node))
    }
}
