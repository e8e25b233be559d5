//! The enrichment pipeline
//!
//! Change events flow through the ingestor into a deduplicating pending
//! set. The debounce scheduler wakes the batch worker once per burst; the
//! worker drains the set and, node by node, invokes the engine and swaps
//! the node's stored metadata for the new graph.
//!
//! ```text
//! repository ──events──▶ EventIngestor ──insert──▶ PendingSet
//!                              │ signal                 │ drain_all
//!                              ▼                        ▼
//!                     DebounceScheduler ──wake──▶ BatchWorker
//!                                                      │
//!                                 EnhancementInvoker ◀─┴─▶ MetadataReplacer
//! ```

mod config;
mod debounce;
mod error;
mod ingest;
mod invoker;
mod lifecycle;
mod pending;
mod replacer;
mod worker;

pub use tokio_util::sync::CancellationToken;
pub use config::{ConfigError, PipelineConfig};
pub use debounce::{DebounceScheduler, Wake};
pub use error::{IngestError, PipelineError, PipelineResult, ProcessError};
pub use ingest::{EventIngestor, IngestSummary};
pub use invoker::{content_uri, EnhancementInvoker};
pub use lifecycle::EnrichmentPipeline;
pub use pending::{Batch, InsertOutcome, PendingSet};
pub use replacer::{MetadataReplacer, ReplaceOutcome};
pub use worker::{process_node, BatchReport, BatchWorker, FailedItem, WorkerStats};
