//! The batch worker
//!
//! One long-running task: wait for a burst to settle, drain the pending
//! set, enrich every drained node. A failing node is logged and skipped;
//! it never stops the batch or the loop. The loop exits only when the
//! cancellation token fires. The node being processed at that moment
//! finishes; nodes of the batch not yet started are abandoned and put
//! back into the pending set.

use super::debounce::DebounceScheduler;
use super::error::ProcessError;
use super::invoker::EnhancementInvoker;
use super::pending::{Batch, PendingSet};
use super::replacer::{MetadataReplacer, ReplaceOutcome};
use crate::repository::NodePath;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Capacity of the batch report channel; slow subscribers lag, they
/// never block the worker
const REPORT_CHANNEL_CAPACITY: usize = 64;

/// A node that could not be enriched in its batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub node: NodePath,
    pub reason: String,
}

/// Outcome of one drained batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Drain generation of the batch, see `PendingSet::next_drain`
    pub generation: u64,
    pub size: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedItem>,
    /// Drained but not started before cancellation
    pub abandoned: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    fn start(batch: &Batch) -> Self {
        let now = Utc::now();
        Self {
            generation: batch.generation(),
            size: batch.len(),
            succeeded: 0,
            failed: Vec::new(),
            abandoned: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.abandoned == 0
    }
}

/// Running totals across every batch the worker has finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub batches: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub abandoned: u64,
}

pub struct BatchWorker {
    pending: Arc<PendingSet>,
    scheduler: Arc<DebounceScheduler>,
    invoker: Arc<EnhancementInvoker>,
    replacer: Arc<MetadataReplacer>,
    concurrency: usize,
    reports: broadcast::Sender<BatchReport>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl BatchWorker {
    pub fn new(
        pending: Arc<PendingSet>,
        scheduler: Arc<DebounceScheduler>,
        invoker: Arc<EnhancementInvoker>,
        replacer: Arc<MetadataReplacer>,
    ) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            pending,
            scheduler,
            invoker,
            replacer,
            concurrency: 1,
            reports,
            stats: Arc::new(Mutex::new(WorkerStats::default())),
        }
    }

    /// Process up to `concurrency` nodes of a batch at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sender side of the report channel; call `subscribe()` on it to
    /// receive a report per finished batch
    pub fn reports(&self) -> broadcast::Sender<BatchReport> {
        self.reports.clone()
    }

    pub fn stats(&self) -> Arc<Mutex<WorkerStats>> {
        self.stats.clone()
    }

    /// Run until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            quiet_window_ms = self.scheduler.quiet_window().as_millis() as u64,
            concurrency = self.concurrency,
            "batch worker started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let Some(wake) = self.scheduler.await_batch(&cancel).await else {
                break;
            };

            let batch = self.pending.drain_all();
            if batch.is_empty() {
                trace!(?wake, "woke to an empty pending set");
                continue;
            }

            let report = self.process_batch(&batch, &cancel).await;
            // No subscribers is fine
            let _ = self.reports.send(report);
        }

        let left = self.pending.len();
        info!(pending = left, "batch worker stopped");
    }

    /// Enrich every node of `batch`, in order, isolating failures.
    ///
    /// `cancel` is checked before each node is started.
    pub async fn process_batch(&self, batch: &Batch, cancel: &CancellationToken) -> BatchReport {
        let mut report = BatchReport::start(batch);
        info!(batch_size = batch.len(), "processing batch");

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut in_flight = Vec::with_capacity(batch.len());

        for (started, node) in batch.iter().enumerate() {
            // Waits for a free slot; with concurrency 1 this is the
            // previous node finishing
            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) if !cancel.is_cancelled() => permit,
                _ => {
                    report.abandoned = self.requeue(&batch.as_slice()[started..]);
                    break;
                }
            };

            let invoker = self.invoker.clone();
            let replacer = self.replacer.clone();
            let task_node = node.clone();
            let handle = tokio::spawn(async move {
                let result = process_node(&invoker, &replacer, &task_node).await;
                drop(permit);
                result
            });
            in_flight.push((node.clone(), handle));
        }

        for (node, handle) in in_flight {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ProcessError::Task(e.to_string())),
            };
            match result {
                Ok(outcome) => {
                    report.succeeded += 1;
                    debug!(%node, added = outcome.statements_added, "node enriched");
                }
                Err(e) => {
                    error!(%node, "enrichment failed: {}", e);
                    report.failed.push(FailedItem {
                        node,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.finished_at = Utc::now();
        self.record(&report);
        info!(
            batch_size = report.size,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            abandoned = report.abandoned,
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "batch finished"
        );
        report
    }

    /// Return unstarted nodes to the pending set so they are not lost
    /// with the batch. Stop discards them; a host that only cancelled a
    /// flush sees them again on the next drain.
    fn requeue(&self, nodes: &[NodePath]) -> usize {
        for node in nodes {
            self.pending.insert(node.clone());
        }
        warn!(
            abandoned = nodes.len(),
            nodes = ?nodes,
            "cancelled mid-batch, unstarted nodes returned to pending"
        );
        nodes.len()
    }

    fn record(&self, report: &BatchReport) {
        let mut stats = self.stats.lock().unwrap();
        stats.batches += 1;
        stats.succeeded += report.succeeded as u64;
        stats.failed += report.failed.len() as u64;
        stats.abandoned += report.abandoned as u64;
    }
}

/// Enrich one node and replace its stored metadata.
///
/// The store is only touched once the engine has produced a graph, so a
/// failed read or engine call leaves the node's metadata as it was.
pub async fn process_node(
    invoker: &EnhancementInvoker,
    replacer: &MetadataReplacer,
    node: &NodePath,
) -> Result<ReplaceOutcome, ProcessError> {
    let (uri, graph) = invoker.invoke(node).await?;
    Ok(replacer.replace(&uri, &graph).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancer::MockEngine;
    use crate::graph::vocab::extracted_from;
    use crate::graph::Term;
    use crate::repository::MemoryRepository;
    use crate::storage::{MemoryStore, MetadataStore};
    use std::time::Duration;

    struct Fixture {
        repo: Arc<MemoryRepository>,
        engine: Arc<MockEngine>,
        store: Arc<MemoryStore>,
        pending: Arc<PendingSet>,
        scheduler: Arc<DebounceScheduler>,
        worker: BatchWorker,
    }

    fn fixture(engine: MockEngine) -> Fixture {
        let repo = Arc::new(MemoryRepository::new());
        let engine = Arc::new(engine);
        let store = Arc::new(MemoryStore::new());
        let pending = Arc::new(PendingSet::new());
        let scheduler = Arc::new(DebounceScheduler::new(Duration::from_millis(1000)));
        let invoker = Arc::new(EnhancementInvoker::new(
            repo.clone(),
            engine.clone(),
            "urn:loom:content",
            "application/octet-stream",
        ));
        let replacer = Arc::new(MetadataReplacer::new(store.clone()));
        let worker = BatchWorker::new(pending.clone(), scheduler.clone(), invoker, replacer);
        Fixture {
            repo,
            engine,
            store,
            pending,
            scheduler,
            worker,
        }
    }

    fn path(p: &str) -> NodePath {
        NodePath::parse(p).unwrap()
    }

    fn enhancements_of(store: &MemoryStore, node: &str) -> usize {
        store
            .subjects_with(&extracted_from(), &Term::iri(format!("urn:loom:content{}", node)))
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn batch_enriches_every_node() {
        let f = fixture(MockEngine::new());
        f.repo.put_file(&path("/a"), "a", None);
        f.repo.put_file(&path("/b"), "bb", None);
        let batch: Batch = vec![path("/a"), path("/b")].into_iter().collect();

        let report = f.worker.process_batch(&batch, &CancellationToken::new()).await;

        assert_eq!(report.size, 2);
        assert_eq!(report.succeeded, 2);
        assert!(report.is_clean());
        assert_eq!(enhancements_of(&f.store, "/a"), 1);
        assert_eq!(enhancements_of(&f.store, "/b"), 1);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let f = fixture(MockEngine::new().with_failure("urn:loom:content/b", "corrupt"));
        for p in ["/a", "/b", "/c"] {
            f.repo.put_file(&path(p), "x", None);
        }
        f.repo.fail_reads_for(&path("/c"));
        f.repo.put_file(&path("/d"), "x", None);
        let batch: Batch = ["/a", "/b", "/c", "/d"].into_iter().map(path).collect();

        let report = f.worker.process_batch(&batch, &CancellationToken::new()).await;

        assert_eq!(report.succeeded, 2);
        let failed: Vec<_> = report.failed.iter().map(|item| item.node.as_str()).collect();
        assert_eq!(failed, vec!["/b", "/c"]);
        assert_eq!(enhancements_of(&f.store, "/a"), 1);
        assert_eq!(enhancements_of(&f.store, "/b"), 0);
        assert_eq!(enhancements_of(&f.store, "/d"), 1);
    }

    #[tokio::test]
    async fn engine_failure_keeps_previous_metadata() {
        let f = fixture(MockEngine::new());
        f.repo.put_file(&path("/a"), "x", None);
        let batch: Batch = vec![path("/a")].into_iter().collect();
        f.worker.process_batch(&batch, &CancellationToken::new()).await;
        let before = f.store.triples().unwrap();

        f.repo.fail_reads_for(&path("/a"));
        let report = f.worker.process_batch(&batch, &CancellationToken::new()).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(f.store.triples().unwrap(), before);
    }

    #[tokio::test]
    async fn cancelled_token_abandons_unstarted_nodes() {
        let f = fixture(MockEngine::new());
        f.repo.put_file(&path("/a"), "x", None);
        let batch: Batch = vec![path("/a")].into_iter().collect();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = f.worker.process_batch(&batch, &cancel).await;

        assert_eq!(report.abandoned, 1);
        assert!(f.engine.calls().is_empty());
        assert_eq!(f.pending.drain_all().as_slice(), &[path("/a")]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_overlaps_engine_calls() {
        let f = fixture(MockEngine::new().with_delay(Duration::from_secs(1)));
        for p in ["/a", "/b", "/c", "/d"] {
            f.repo.put_file(&path(p), "x", None);
        }
        let worker = f.worker.with_concurrency(4);
        let batch: Batch = ["/a", "/b", "/c", "/d"].into_iter().map(path).collect();

        let start = tokio::time::Instant::now();
        let report = worker.process_batch(&batch, &CancellationToken::new()).await;

        assert_eq!(report.succeeded, 4);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_drains_after_quiet_window_and_reports() {
        let f = fixture(MockEngine::new());
        f.repo.put_file(&path("/a"), "x", None);
        let stats = f.worker.stats();
        let mut reports = f.worker.reports().subscribe();
        let cancel = CancellationToken::new();
        let worker = Arc::new(f.worker);
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };

        f.pending.insert(path("/a"));
        f.scheduler.signal();

        let report = reports.recv().await.unwrap();
        assert_eq!(report.size, 1);
        assert_eq!(report.succeeded, 1);
        assert!(f.pending.is_empty());

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(stats.lock().unwrap().batches, 1);
    }
}
