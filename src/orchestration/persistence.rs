//! Best-effort persistence of evaluation results.
//!
//! Storing is fire-and-forget: the evaluation pipeline spawns the write as
//! soon as a result is computed and moves on. Writes are tracked so the
//! caller can wait for them before the runtime goes away. Failures are
//! logged and never reach the interview.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::error::Result;
use crate::evaluation::EvaluationResult;

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn store(&self, result: &EvaluationResult) -> Result<()>;
}

/// Spawn a write of `result` on `tasks` without waiting for it.
pub fn spawn_store(
    tasks: &TaskTracker,
    store: &Arc<dyn EvaluationStore>,
    result: &EvaluationResult,
) {
    let store = Arc::clone(store);
    let result = result.clone();
    tasks.spawn(async move {
        if let Err(e) = store.store(&result).await {
            warn!(session = %result.session_id, error = %e, "failed to persist evaluation");
        }
    });
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl EvaluationStore for NullStore {
    async fn store(&self, _result: &EvaluationResult) -> Result<()> {
        Ok(())
    }
}

/// Keeps results in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    results: Mutex<Vec<EvaluationResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<EvaluationResult> {
        self.results
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.results().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EvaluationStore for MemoryStore {
    async fn store(&self, result: &EvaluationResult) -> Result<()> {
        let mut results = self
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results.push(result.clone());
        Ok(())
    }
}

/// Appends one JSON object per evaluation to a file.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    // Serializes appends so concurrent lines never interleave.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EvaluationStore for JsonlStore {
    async fn store(&self, result: &EvaluationResult) -> Result<()> {
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        debug!(path = %self.path.display(), session = %result.session_id, "evaluation persisted");
        Ok(())
    }
}
