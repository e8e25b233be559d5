//! Repository trait: the content store the pipeline watches

use super::event::{RawEvent, SubscriptionFilter};
use super::path::NodePath;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors from repository access
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("malformed path: {0}")]
    MalformedPath(String),
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("change observation is not supported by this repository")]
    ObservationUnsupported,
    #[error("unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),
    #[error("repository I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("repository error: {0}")]
    Internal(String),
}

/// Handle returned by `subscribe`, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current payload of a content node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContent {
    pub data: Vec<u8>,
    /// None when the node carries no mime type
    pub mime_type: Option<String>,
}

/// Where a node keeps its payload, relative to the node itself
///
/// Change events for a node's payload arrive on
/// `<node>/<content_node>/<data_property>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLayout {
    pub content_node: String,
    pub data_property: String,
    pub mime_property: String,
}

impl ContentLayout {
    /// `/<content_node>/<data_property>`
    pub fn payload_suffix(&self) -> String {
        format!("/{}/{}", self.content_node, self.data_property)
    }

    /// Path of a node's payload property
    pub fn payload_path(&self, node: &NodePath) -> String {
        if node.is_root() {
            self.payload_suffix()
        } else {
            format!("{}{}", node, self.payload_suffix())
        }
    }

    pub fn mime_path(&self, node: &NodePath) -> String {
        let suffix = format!("/{}/{}", self.content_node, self.mime_property);
        if node.is_root() {
            suffix
        } else {
            format!("{}{}", node, suffix)
        }
    }
}

impl Default for ContentLayout {
    fn default() -> Self {
        Self {
            content_node: "jcr:content".to_string(),
            data_property: "jcr:data".to_string(),
            mime_property: "jcr:mimeType".to_string(),
        }
    }
}

/// Receives batches of change notifications
///
/// Repositories may call this concurrently from several delivery threads
/// and may redeliver events. Implementations must not block for long.
pub trait ChangeListener: Send + Sync {
    fn on_events(&self, events: Vec<RawEvent>);
}

/// The content store the pipeline watches and reads from
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Whether `subscribe` can succeed at all
    fn observation_supported(&self) -> bool;

    /// Register a listener for changes matching `filter`.
    ///
    /// Returns `RepositoryError::ObservationUnsupported` if the repository
    /// cannot deliver change notifications.
    fn subscribe(
        &self,
        filter: SubscriptionFilter,
        listener: Arc<dyn ChangeListener>,
    ) -> Result<SubscriptionId, RepositoryError>;

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), RepositoryError>;

    /// Resolve a path to the identity of an existing node.
    ///
    /// Fails with `NotFound` if no node lives there any more.
    fn resolve(&self, path: &NodePath) -> Result<NodePath, RepositoryError>;

    /// Read a node's current payload and mime type
    async fn read(&self, node: &NodePath) -> Result<NodeContent, RepositoryError>;
}
