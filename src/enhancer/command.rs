//! Subprocess engine: runs an external enhancer per content item
//!
//! The content bytes are written to the child's stdin; the item's URI and
//! mime type are passed as `LOOM_CONTENT_URI` and `LOOM_MIME_TYPE`. The
//! child must print a JSON array of statements on stdout, e.g.
//!
//! ```text
//! [{"subject": {"type": "iri", "value": "urn:e1"},
//!   "predicate": "http://fise.iks-project.eu/ontology/extracted-from",
//!   "object": {"type": "iri", "value": "urn:loom:content/a.txt"}}]
//! ```
//!
//! A non-zero exit status means the engine rejected the item.

use super::traits::{ContentItem, EngineError, EnhancementEngine};
use crate::graph::MetadataGraph;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the child and fail with `EngineError::Timeout` after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn run(&self, item: &ContentItem) -> Result<MetadataGraph, EngineError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("LOOM_CONTENT_URI", item.uri.as_str())
            .env("LOOM_MIME_TYPE", &item.mime_type)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    EngineError::Unavailable(format!("{}: {}", self.program, e))
                }
                _ => EngineError::Io(e),
            })?;

        // Write stdin concurrently with reading output: the child may block
        // on a full stdout pipe before it has drained its input.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("child stdin not captured".to_string()))?;
        let data = item.data.clone();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&data).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await?;
        // An engine that ignores stdin closes the pipe early
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EngineError::Rejected(format!(
                "{} exited with {}: {}",
                self.program, output.status, stderr
            )));
        }

        serde_json::from_slice::<MetadataGraph>(&output.stdout)
            .map_err(|e| EngineError::InvalidOutput(e.to_string()))
    }
}

#[async_trait]
impl EnhancementEngine for CommandEngine {
    async fn enhance(&self, item: &ContentItem) -> Result<MetadataGraph, EngineError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(item))
                .await
                .map_err(|_| EngineError::Timeout(limit))?,
            None => self.run(item).await,
        }
    }
}
