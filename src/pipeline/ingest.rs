//! Event ingestion: raw change notifications in, pending nodes out
//!
//! Runs on the repository's delivery threads. Never fails towards the
//! caller: events it cannot use are ignored or dropped with a log line.
//! Redelivered or reordered events are harmless because a node can be
//! pending only once.

use super::debounce::DebounceScheduler;
use super::error::IngestError;
use super::pending::{InsertOutcome, PendingSet};
use crate::repository::{
    ChangeListener, ContentRepository, EventMask, NodePath, RawEvent, RepositoryError,
};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What happened to each event of one delivery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Made a node newly pending
    pub accepted: usize,
    /// Named a node that was already pending
    pub coalesced: usize,
    /// Not a watched payload change
    pub ignored: usize,
    /// Looked like a payload change but could not be resolved
    pub dropped: usize,
}

enum Disposition {
    Pending(NodePath),
    Ignored,
}

pub struct EventIngestor {
    repository: Arc<dyn ContentRepository>,
    pending: Arc<PendingSet>,
    scheduler: Arc<DebounceScheduler>,
    root: NodePath,
    kinds: EventMask,
    payload_suffix: String,
    flush_threshold: usize,
}

impl EventIngestor {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        pending: Arc<PendingSet>,
        scheduler: Arc<DebounceScheduler>,
        root: NodePath,
        kinds: EventMask,
        payload_suffix: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            pending,
            scheduler,
            root,
            kinds,
            payload_suffix: payload_suffix.into(),
            flush_threshold: usize::MAX,
        }
    }

    /// Ask the scheduler to skip the quiet window once this many nodes wait
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold.max(1);
        self
    }

    /// Feed one delivery of raw events into the pending set.
    pub fn ingest(&self, events: Vec<RawEvent>) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for event in events {
            match self.classify(&event) {
                Ok(Disposition::Ignored) => summary.ignored += 1,
                Ok(Disposition::Pending(node)) => match self.pending.insert(node.clone()) {
                    InsertOutcome::Added { pending } => {
                        summary.accepted += 1;
                        trace!(%node, pending, "node pending");
                        if pending >= self.flush_threshold {
                            debug!(pending, "pending backlog reached flush threshold");
                            self.scheduler.request_flush();
                        } else {
                            self.scheduler.signal();
                        }
                    }
                    InsertOutcome::AlreadyPending => summary.coalesced += 1,
                },
                Err(e @ IngestError::Malformed(_)) => {
                    summary.dropped += 1;
                    debug!(path = %event.path, "dropping event: {}", e);
                }
                Err(e) => {
                    summary.dropped += 1;
                    warn!(path = %event.path, "dropping event: {}", e);
                }
            }
        }

        summary
    }

    /// Decide whether an event names a watched node's payload, and which node.
    fn classify(&self, event: &RawEvent) -> Result<Disposition, IngestError> {
        if !self.kinds.contains(event.kind) {
            return Ok(Disposition::Ignored);
        }
        let Some(node_part) = event.path.strip_suffix(self.payload_suffix.as_str()) else {
            return Ok(Disposition::Ignored);
        };

        let raw = if node_part.is_empty() { "/" } else { node_part };
        let node = NodePath::parse(raw).map_err(|_| IngestError::Malformed(event.path.clone()))?;
        if !node.is_within(&self.root) {
            return Ok(Disposition::Ignored);
        }

        let resolved = self
            .repository
            .resolve(&node)
            .map_err(|source| match source {
                RepositoryError::MalformedPath(_) => IngestError::Malformed(event.path.clone()),
                source => IngestError::Unresolvable {
                    path: event.path.clone(),
                    source,
                },
            })?;
        Ok(Disposition::Pending(resolved))
    }
}

impl ChangeListener for EventIngestor {
    fn on_events(&self, events: Vec<RawEvent>) {
        let summary = self.ingest(events);
        trace!(?summary, "change notification ingested");
    }
}
