//! Pipeline lifecycle: wiring, start and stop
//!
//! `start` subscribes the ingestor to the repository and spawns the batch
//! worker. `stop` unsubscribes first so no new work arrives, then cancels
//! the worker and waits for it. The node in flight finishes; anything
//! still pending is discarded.
//!
//! A repository without change observation yields a disabled pipeline:
//! no subscription, no background worker. Hosts can still push events
//! through `notify` and process them with `flush`.

use super::config::PipelineConfig;
use super::debounce::DebounceScheduler;
use super::error::{PipelineError, PipelineResult};
use super::ingest::{EventIngestor, IngestSummary};
use super::invoker::EnhancementInvoker;
use super::pending::PendingSet;
use super::replacer::MetadataReplacer;
use super::worker::{BatchReport, BatchWorker, WorkerStats};
use crate::enhancer::EnhancementEngine;
use crate::repository::{ContentRepository, RawEvent, RepositoryError, SubscriptionId};
use crate::storage::MetadataStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Running {
    subscription: SubscriptionId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct EnrichmentPipeline {
    config: PipelineConfig,
    repository: Arc<dyn ContentRepository>,
    store: Arc<dyn MetadataStore>,
    pending: Arc<PendingSet>,
    scheduler: Arc<DebounceScheduler>,
    ingestor: Arc<EventIngestor>,
    worker: Arc<BatchWorker>,
    running: Option<Running>,
}

impl EnrichmentPipeline {
    /// Wire the pipeline and, if the repository supports observation,
    /// subscribe and start the worker.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(
        config: PipelineConfig,
        repository: Arc<dyn ContentRepository>,
        engine: Arc<dyn EnhancementEngine>,
        store: Arc<dyn MetadataStore>,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let layout = config.layout();

        let pending = Arc::new(PendingSet::new());
        let scheduler = Arc::new(DebounceScheduler::new(config.quiet_window()));
        let ingestor = Arc::new(
            EventIngestor::new(
                repository.clone(),
                pending.clone(),
                scheduler.clone(),
                config.root()?,
                config.event_mask(),
                layout.payload_suffix(),
            )
            .with_flush_threshold(config.flush_threshold),
        );
        let invoker = Arc::new(EnhancementInvoker::new(
            repository.clone(),
            engine,
            config.uri_prefix.clone(),
            config.default_mime_type.clone(),
        ));
        let replacer = Arc::new(MetadataReplacer::new(store.clone()));
        let worker = Arc::new(
            BatchWorker::new(pending.clone(), scheduler.clone(), invoker, replacer)
                .with_concurrency(config.concurrency),
        );

        let mut pipeline = Self {
            config,
            repository,
            store,
            pending,
            scheduler,
            ingestor,
            worker,
            running: None,
        };

        if !pipeline.repository.observation_supported() {
            warn!("observation is not supported by the repository, enrichment disabled");
            return Ok(pipeline);
        }

        let filter = pipeline.config.subscription_filter()?;
        let subscription = match pipeline
            .repository
            .subscribe(filter, pipeline.ingestor.clone())
        {
            Ok(id) => id,
            Err(RepositoryError::ObservationUnsupported) => {
                warn!("observation is not supported by the repository, enrichment disabled");
                return Ok(pipeline);
            }
            Err(e) => return Err(PipelineError::Subscription(e)),
        };

        let cancel = CancellationToken::new();
        let handle = {
            let worker = pipeline.worker.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };
        pipeline.running = Some(Running {
            subscription,
            cancel,
            handle,
        });

        info!(
            %subscription,
            content_path = %pipeline.config.content_path,
            "enrichment pipeline started"
        );
        Ok(pipeline)
    }

    /// Whether the pipeline is subscribed and its worker running
    pub fn is_enabled(&self) -> bool {
        self.running.is_some()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Feed change events directly, as a repository subscription would
    pub fn notify(&self, events: Vec<RawEvent>) -> IngestSummary {
        self.ingestor.ingest(events)
    }

    /// Number of nodes waiting for the next batch
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Process whatever is pending right now, without waiting for the
    /// quiet window. Returns `None` if nothing was pending.
    ///
    /// A running worker is asked to flush and the report of the batch
    /// holding the current backlog is returned; the worker stays the only
    /// batch processor. A disabled pipeline processes the batch on the
    /// caller's task.
    pub async fn flush(&self) -> Option<BatchReport> {
        if self.running.is_none() {
            let batch = self.pending.drain_all();
            if batch.is_empty() {
                return None;
            }
            return Some(self.worker.process_batch(&batch, &CancellationToken::new()).await);
        }

        // Subscribe before asking so the report cannot go out unseen
        let mut reports = self.worker.reports().subscribe();
        let generation = self.pending.next_drain()?;
        self.scheduler.request_flush();
        loop {
            match reports.recv().await {
                Ok(report) if report.generation >= generation => return Some(report),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "flush fell behind the batch reports");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// A report per batch processed by the background worker
    pub fn reports(&self) -> broadcast::Receiver<BatchReport> {
        self.worker.reports().subscribe()
    }

    pub fn stats(&self) -> WorkerStats {
        *self.worker.stats().lock().unwrap()
    }

    /// Unsubscribe, cancel the worker, and wait for it to finish.
    pub async fn stop(mut self) -> PipelineResult<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        if let Err(e) = self.repository.unsubscribe(running.subscription) {
            warn!(subscription = %running.subscription, "unsubscribe failed: {}", e);
        }
        running.cancel.cancel();
        running
            .handle
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?;

        let discarded = self.pending.drain_all();
        if !discarded.is_empty() {
            warn!(
                discarded = discarded.len(),
                nodes = ?discarded.as_slice(),
                "pending nodes discarded at stop"
            );
        }
        info!("enrichment pipeline stopped");
        Ok(())
    }
}

impl Drop for EnrichmentPipeline {
    fn drop(&mut self) {
        // Dropped without stop(): detach from the repository and let the
        // worker wind down on its own
        if let Some(running) = self.running.take() {
            let _ = self.repository.unsubscribe(running.subscription);
            running.cancel.cancel();
        }
    }
}
