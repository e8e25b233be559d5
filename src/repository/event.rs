//! Raw change notifications and subscription filters

use super::path::NodePath;
use serde::{Deserialize, Serialize};

/// What happened to the item at an event's path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NodeAdded,
    NodeRemoved,
    NodeMoved,
    PropertyAdded,
    PropertyChanged,
    PropertyRemoved,
}

impl EventKind {
    fn bit(self) -> u32 {
        match self {
            Self::NodeAdded => 1,
            Self::NodeRemoved => 1 << 1,
            Self::PropertyAdded => 1 << 2,
            Self::PropertyRemoved => 1 << 3,
            Self::PropertyChanged => 1 << 4,
            Self::NodeMoved => 1 << 5,
        }
    }
}

/// A set of event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventMask(u32);

impl EventMask {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(self, kind: EventKind) -> Self {
        Self(self.0 | kind.bit())
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Node creation plus payload writes: the kinds that mean content changed
    pub fn content_changes() -> Self {
        Self::empty()
            .with(EventKind::NodeAdded)
            .with(EventKind::PropertyAdded)
            .with(EventKind::PropertyChanged)
    }
}

impl FromIterator<EventKind> for EventMask {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// A change notification as delivered by the repository
///
/// The path is kept raw: repositories may deliver paths the pipeline
/// cannot interpret, and those are filtered out at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub kind: EventKind,
    pub path: String,
}

impl RawEvent {
    pub fn new(kind: EventKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Which changes a listener wants to hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    /// Only events at or below this path
    pub root: NodePath,
    /// If false, only events on the root's direct children
    pub deep: bool,
    pub kinds: EventMask,
    /// Node types of the node an event is associated with; empty = any
    pub node_types: Vec<String>,
}

impl SubscriptionFilter {
    pub fn new(root: NodePath) -> Self {
        Self {
            root,
            deep: true,
            kinds: EventMask::content_changes(),
            node_types: Vec::new(),
        }
    }

    pub fn with_kinds(mut self, kinds: EventMask) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_node_types(mut self, node_types: Vec<String>) -> Self {
        self.node_types = node_types;
        self
    }

    pub fn shallow(mut self) -> Self {
        self.deep = false;
        self
    }

    /// Whether an event of `kind` at `path`, associated with a node of
    /// `node_type`, passes this filter
    pub fn matches(&self, kind: EventKind, path: &NodePath, node_type: &str) -> bool {
        if !self.kinds.contains(kind) {
            return false;
        }
        if !self.node_types.is_empty() && !self.node_types.iter().any(|t| t == node_type) {
            return false;
        }
        if self.deep {
            path.is_within(&self.root)
        } else {
            path.parent().as_ref() == Some(&self.root)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> NodePath {
        NodePath::parse(p).unwrap()
    }

    #[test]
    fn mask_collects_kinds() {
        let mask: EventMask = vec![EventKind::NodeAdded, EventKind::PropertyChanged]
            .into_iter()
            .collect();
        assert!(mask.contains(EventKind::NodeAdded));
        assert!(mask.contains(EventKind::PropertyChanged));
        assert!(!mask.contains(EventKind::PropertyAdded));
        assert!(!EventMask::empty().contains(EventKind::NodeAdded));
    }

    #[test]
    fn content_changes_excludes_removals() {
        let mask = EventMask::content_changes();
        assert!(!mask.contains(EventKind::NodeRemoved));
        assert!(!mask.contains(EventKind::PropertyRemoved));
        assert!(mask.contains(EventKind::PropertyAdded));
    }

    #[test]
    fn filter_checks_kind_type_and_location() {
        let filter = SubscriptionFilter::new(path("/docs"))
            .with_node_types(vec!["nt:resource".to_string()]);

        let data = path("/docs/a/jcr:content/jcr:data");
        assert!(filter.matches(EventKind::PropertyChanged, &data, "nt:resource"));
        assert!(!filter.matches(EventKind::PropertyRemoved, &data, "nt:resource"));
        assert!(!filter.matches(EventKind::PropertyChanged, &data, "nt:folder"));
        assert!(!filter.matches(
            EventKind::PropertyChanged,
            &path("/other/jcr:content/jcr:data"),
            "nt:resource"
        ));
    }

    #[test]
    fn shallow_filter_only_sees_direct_children() {
        let filter = SubscriptionFilter::new(path("/docs")).shallow();
        assert!(filter.matches(EventKind::NodeAdded, &path("/docs/a"), "nt:file"));
        assert!(!filter.matches(EventKind::NodeAdded, &path("/docs/a/b"), "nt:file"));
    }

    #[test]
    fn event_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EventKind::PropertyChanged).unwrap();
        assert_eq!(json, "\"property_changed\"");
    }
}
