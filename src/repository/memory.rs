//! In-process observable repository
//!
//! Holds file nodes in memory and delivers change notifications to
//! subscribers synchronously on the writer's thread, the way a JCR
//! observation manager hands events to its listeners. Used by embedding
//! hosts and throughout the test suite.

use super::event::{EventKind, RawEvent, SubscriptionFilter};
use super::path::NodePath;
use super::traits::{
    ChangeListener, ContentLayout, ContentRepository, NodeContent, RepositoryError,
    SubscriptionId,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

/// Node type of file nodes unless the writer says otherwise
pub const FILE_NODE_TYPE: &str = "nt:file";
/// Node type of the content child holding a file's payload
pub const RESOURCE_NODE_TYPE: &str = "nt:resource";

#[derive(Debug, Clone)]
struct StoredNode {
    node_type: String,
    data: Vec<u8>,
    mime_type: Option<String>,
}

type Subscriber = (SubscriptionFilter, Arc<dyn ChangeListener>);

pub struct MemoryRepository {
    layout: ContentLayout,
    observation: bool,
    nodes: RwLock<BTreeMap<NodePath, StoredNode>>,
    subscribers: Mutex<HashMap<SubscriptionId, Subscriber>>,
    failing_reads: Mutex<HashSet<NodePath>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            layout: ContentLayout::default(),
            observation: true,
            nodes: RwLock::new(BTreeMap::new()),
            subscribers: Mutex::new(HashMap::new()),
            failing_reads: Mutex::new(HashSet::new()),
        }
    }

    /// A repository whose `subscribe` always fails
    pub fn without_observation() -> Self {
        Self {
            observation: false,
            ..Self::new()
        }
    }

    pub fn with_layout(mut self, layout: ContentLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &ContentLayout {
        &self.layout
    }

    /// Create or overwrite a file node, notifying subscribers
    pub fn put_file(
        &self,
        path: &NodePath,
        data: impl Into<Vec<u8>>,
        mime_type: Option<&str>,
    ) {
        self.put_node(path, FILE_NODE_TYPE, data, mime_type)
    }

    /// Create or overwrite a node of the given type, notifying subscribers
    pub fn put_node(
        &self,
        path: &NodePath,
        node_type: &str,
        data: impl Into<Vec<u8>>,
        mime_type: Option<&str>,
    ) {
        let node = StoredNode {
            node_type: node_type.to_string(),
            data: data.into(),
            mime_type: mime_type.map(str::to_string),
        };
        let existed = self
            .nodes
            .write()
            .unwrap()
            .insert(path.clone(), node)
            .is_some();

        let payload = self.layout.payload_path(path);
        let mut events = Vec::new();
        if existed {
            events.push((RawEvent::new(EventKind::PropertyChanged, payload), RESOURCE_NODE_TYPE));
        } else {
            events.push((RawEvent::new(EventKind::NodeAdded, path.as_str()), node_type));
            events.push((RawEvent::new(EventKind::PropertyAdded, payload), RESOURCE_NODE_TYPE));
            if mime_type.is_some() {
                events.push((
                    RawEvent::new(EventKind::PropertyAdded, self.layout.mime_path(path)),
                    RESOURCE_NODE_TYPE,
                ));
            }
        }
        self.dispatch(events);
    }

    /// Remove a node, notifying subscribers. Returns false if absent.
    pub fn remove(&self, path: &NodePath) -> bool {
        let removed = self.nodes.write().unwrap().remove(path);
        match removed {
            Some(node) => {
                self.dispatch(vec![(
                    RawEvent::new(EventKind::NodeRemoved, path.as_str()),
                    node.node_type.as_str(),
                )]);
                true
            }
            None => false,
        }
    }

    /// Deliver events verbatim to every subscriber, bypassing filters.
    ///
    /// Models a notification mechanism that redelivers or hands over
    /// events the subscriber never asked for.
    pub fn deliver_raw(&self, events: Vec<RawEvent>) {
        for listener in self.listeners() {
            listener.on_events(events.clone());
        }
    }

    /// Make subsequent reads of `path` fail with an I/O error
    pub fn fail_reads_for(&self, path: &NodePath) {
        self.failing_reads.lock().unwrap().insert(path.clone());
    }

    pub fn restore_reads_for(&self, path: &NodePath) {
        self.failing_reads.lock().unwrap().remove(path);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    fn listeners(&self) -> Vec<Arc<dyn ChangeListener>> {
        self.subscribers
            .lock()
            .unwrap()
            .values()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    /// Hand matching events to each subscriber, outside every lock
    fn dispatch(&self, events: Vec<(RawEvent, &str)>) {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();

        for (filter, listener) in subscribers {
            let matching: Vec<RawEvent> = events
                .iter()
                .filter(|(event, node_type)| {
                    NodePath::parse(&event.path)
                        .map(|p| filter.matches(event.kind, &p, node_type))
                        .unwrap_or(false)
                })
                .map(|(event, _)| event.clone())
                .collect();
            if !matching.is_empty() {
                listener.on_events(matching);
            }
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    fn observation_supported(&self) -> bool {
        self.observation
    }

    fn subscribe(
        &self,
        filter: SubscriptionFilter,
        listener: Arc<dyn ChangeListener>,
    ) -> Result<SubscriptionId, RepositoryError> {
        if !self.observation {
            return Err(RepositoryError::ObservationUnsupported);
        }
        let id = SubscriptionId::new();
        self.subscribers.lock().unwrap().insert(id, (filter, listener));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), RepositoryError> {
        self.subscribers
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::UnknownSubscription(id))
    }

    fn resolve(&self, path: &NodePath) -> Result<NodePath, RepositoryError> {
        if self.nodes.read().unwrap().contains_key(path) {
            Ok(path.clone())
        } else {
            Err(RepositoryError::NotFound(path.to_string()))
        }
    }

    async fn read(&self, node: &NodePath) -> Result<NodeContent, RepositoryError> {
        if self.failing_reads.lock().unwrap().contains(node) {
            return Err(RepositoryError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("simulated read failure for {}", node),
            )));
        }
        let nodes = self.nodes.read().unwrap();
        let stored = nodes
            .get(node)
            .ok_or_else(|| RepositoryError::NotFound(node.to_string()))?;
        Ok(NodeContent {
            data: stored.data.clone(),
            mime_type: stored.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::EventMask;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<RawEvent>>,
    }

    impl ChangeListener for Recorder {
        fn on_events(&self, events: Vec<RawEvent>) {
            self.events.lock().unwrap().extend(events);
        }
    }

    fn path(p: &str) -> NodePath {
        NodePath::parse(p).unwrap()
    }

    fn watch_all(repo: &MemoryRepository) -> Arc<Recorder> {
        let recorder = Arc::new(Recorder::default());
        let filter = SubscriptionFilter::new(NodePath::root()).with_kinds(
            EventMask::content_changes()
                .with(EventKind::NodeRemoved)
                .with(EventKind::PropertyChanged),
        );
        repo.subscribe(filter, recorder.clone()).unwrap();
        recorder
    }

    #[test]
    fn new_file_emits_node_and_payload_events() {
        let repo = MemoryRepository::new();
        let recorder = watch_all(&repo);

        repo.put_file(&path("/a.txt"), "hello", Some("text/plain"));

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                RawEvent::new(EventKind::NodeAdded, "/a.txt"),
                RawEvent::new(EventKind::PropertyAdded, "/a.txt/jcr:content/jcr:data"),
                RawEvent::new(EventKind::PropertyAdded, "/a.txt/jcr:content/jcr:mimeType"),
            ]
        );
    }

    #[test]
    fn overwrite_emits_property_changed() {
        let repo = MemoryRepository::new();
        repo.put_file(&path("/a.txt"), "v1", None);
        let recorder = watch_all(&repo);

        repo.put_file(&path("/a.txt"), "v2", None);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![RawEvent::new(EventKind::PropertyChanged, "/a.txt/jcr:content/jcr:data")]
        );
    }

    #[test]
    fn filter_limits_delivery_by_node_type() {
        let repo = MemoryRepository::new();
        let recorder = Arc::new(Recorder::default());
        let filter = SubscriptionFilter::new(NodePath::root())
            .with_node_types(vec![RESOURCE_NODE_TYPE.to_string()]);
        repo.subscribe(filter, recorder.clone()).unwrap();

        repo.put_file(&path("/a.txt"), "hello", None);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![RawEvent::new(EventKind::PropertyAdded, "/a.txt/jcr:content/jcr:data")]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let repo = MemoryRepository::new();
        let recorder = Arc::new(Recorder::default());
        let id = repo
            .subscribe(SubscriptionFilter::new(NodePath::root()), recorder.clone())
            .unwrap();

        repo.unsubscribe(id).unwrap();
        repo.put_file(&path("/a.txt"), "hello", None);

        assert!(recorder.events.lock().unwrap().is_empty());
        assert!(matches!(
            repo.unsubscribe(id),
            Err(RepositoryError::UnknownSubscription(_))
        ));
    }

    #[test]
    fn subscribe_fails_without_observation() {
        let repo = MemoryRepository::without_observation();
        let err = repo
            .subscribe(
                SubscriptionFilter::new(NodePath::root()),
                Arc::new(Recorder::default()),
            )
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ObservationUnsupported));
    }

    #[tokio::test]
    async fn read_returns_payload_and_honours_injected_failures() {
        let repo = MemoryRepository::new();
        let a = path("/a.txt");
        repo.put_file(&a, "hello", Some("text/plain"));

        let content = repo.read(&a).await.unwrap();
        assert_eq!(content.data, b"hello");
        assert_eq!(content.mime_type.as_deref(), Some("text/plain"));

        repo.fail_reads_for(&a);
        assert!(matches!(repo.read(&a).await, Err(RepositoryError::Io(_))));

        repo.restore_reads_for(&a);
        assert!(repo.read(&a).await.is_ok());
    }

    #[test]
    fn resolve_fails_after_removal() {
        let repo = MemoryRepository::new();
        let a = path("/a.txt");
        repo.put_file(&a, "hello", None);
        assert_eq!(repo.resolve(&a).unwrap(), a);

        assert!(repo.remove(&a));
        assert!(matches!(repo.resolve(&a), Err(RepositoryError::NotFound(_))));
        assert!(!repo.remove(&a));
    }
}
