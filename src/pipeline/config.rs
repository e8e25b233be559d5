//! Pipeline configuration
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration:
//!
//! ```yaml
//! content_path: /content
//! quiet_window_ms: 500
//! event_kinds: [node_added, property_changed]
//! ```

use crate::repository::{
    ContentLayout, EventKind, EventMask, NodePath, SubscriptionFilter,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the watched subtree
    pub content_path: String,
    /// Watch the whole subtree rather than direct children only
    pub deep: bool,
    /// Node types whose changes are observed
    pub node_types: Vec<String>,
    /// Change kinds that trigger enrichment
    pub event_kinds: Vec<EventKind>,
    /// Child node holding a file's payload
    pub content_node: String,
    /// Payload property on the content node
    pub data_property: String,
    /// Mime type property on the content node
    pub mime_property: String,
    /// Mime type assumed when a node has none
    pub default_mime_type: String,
    /// Prefix of canonical content URIs; the node path is appended
    pub uri_prefix: String,
    /// How long to wait after the first change before draining
    pub quiet_window_ms: u64,
    /// Pending-set size at which the quiet window is cut short
    pub flush_threshold: usize,
    /// Nodes processed concurrently within a batch
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            content_path: "/".to_string(),
            deep: true,
            node_types: vec!["nt:file".to_string(), "nt:resource".to_string()],
            event_kinds: vec![
                EventKind::NodeAdded,
                EventKind::PropertyAdded,
                EventKind::PropertyChanged,
            ],
            content_node: "jcr:content".to_string(),
            data_property: "jcr:data".to_string(),
            mime_property: "jcr:mimeType".to_string(),
            default_mime_type: "application/octet-stream".to_string(),
            uri_prefix: "urn:loom:content".to_string(),
            quiet_window_ms: 1000,
            flush_threshold: 1024,
            concurrency: 1,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document; treat it as all-defaults
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        NodePath::parse(&self.content_path).map_err(|_| {
            ConfigError::Invalid(format!(
                "content_path must be an absolute path, got '{}'",
                self.content_path
            ))
        })?;
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.flush_threshold == 0 {
            return Err(ConfigError::Invalid("flush_threshold must be at least 1".to_string()));
        }
        for (name, segment) in [
            ("content_node", &self.content_node),
            ("data_property", &self.data_property),
            ("mime_property", &self.mime_property),
        ] {
            if segment.is_empty() || segment.contains('/') {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a single path segment, got '{}'",
                    name, segment
                )));
            }
        }
        if self.uri_prefix.is_empty() {
            return Err(ConfigError::Invalid("uri_prefix must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }

    pub fn event_mask(&self) -> EventMask {
        self.event_kinds.iter().copied().collect()
    }

    pub fn root(&self) -> Result<NodePath, ConfigError> {
        NodePath::parse(&self.content_path)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn layout(&self) -> ContentLayout {
        ContentLayout {
            content_node: self.content_node.clone(),
            data_property: self.data_property.clone(),
            mime_property: self.mime_property.clone(),
        }
    }

    /// The subscription the pipeline registers with the repository
    pub fn subscription_filter(&self) -> Result<SubscriptionFilter, ConfigError> {
        let filter = SubscriptionFilter::new(self.root()?)
            .with_kinds(self.event_mask())
            .with_node_types(self.node_types.clone());
        Ok(if self.deep { filter } else { filter.shallow() })
    }
}
