//! Async facade for tokio applications.
//!
//! [`Checkpoint`] blocks the calling thread while it waits on its waiter and
//! on the filesystem. `AsyncCheckpoint` moves those calls onto tokio's
//! blocking pool so they never stall an async worker.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::checkpoint::Checkpoint;
use crate::error::CheckpointError;

/// Shared, async-friendly handle to a [`Checkpoint`].
#[derive(Debug, Clone)]
pub struct AsyncCheckpoint {
    inner: Arc<Checkpoint>,
}

impl AsyncCheckpoint {
    /// Wrap a checkpoint.
    pub fn new(checkpoint: Checkpoint) -> Self {
        Self {
            inner: Arc::new(checkpoint),
        }
    }

    /// Wrap an already shared checkpoint.
    pub fn from_arc(inner: Arc<Checkpoint>) -> Self {
        Self { inner }
    }

    /// The wrapped checkpoint.
    pub fn inner(&self) -> &Arc<Checkpoint> {
        &self.inner
    }

    /// Get the checkpoint file path.
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Check if the checkpoint file is present.
    pub fn exists(&self) -> bool {
        self.inner.exists()
    }

    /// See [`Checkpoint::enable`].
    pub async fn enable(&self) -> Result<(), CheckpointError> {
        self.blocking(|cp| cp.enable()).await
    }

    /// See [`Checkpoint::try_enable`].
    pub async fn try_enable(&self) -> Result<bool, CheckpointError> {
        self.blocking(|cp| cp.try_enable()).await
    }

    /// See [`Checkpoint::disable`].
    pub async fn disable(&self) -> Result<(), CheckpointError> {
        self.blocking(|cp| cp.disable()).await
    }

    /// See [`Checkpoint::delete`].
    pub async fn delete(&self) -> Result<(), CheckpointError> {
        self.blocking(|cp| cp.delete()).await
    }

    /// See [`Checkpoint::is_enabled`].
    pub async fn is_enabled(&self) -> Result<bool, CheckpointError> {
        self.blocking(|cp| Ok(cp.is_enabled())).await
    }

    /// Run `work` unless the checkpoint is already active.
    ///
    /// Unlike [`Checkpoint::run_once`] there is no drop guard: if the future
    /// is cancelled mid-way the checkpoint stays enabled until `disable` is
    /// called or the handle is dropped.
    pub async fn run_once<F, Fut, T>(&self, work: F) -> Result<Option<T>, CheckpointError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.try_enable().await? {
            return Ok(None);
        }
        let output = work().await;
        self.disable().await?;
        Ok(Some(output))
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, CheckpointError>
    where
        F: FnOnce(&Checkpoint) -> Result<T, CheckpointError> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| CheckpointError::Cancelled(format!("blocking task failed: {}", e)))?
    }
}

impl From<Checkpoint> for AsyncCheckpoint {
    fn from(checkpoint: Checkpoint) -> Self {
        Self::new(checkpoint)
    }
}
