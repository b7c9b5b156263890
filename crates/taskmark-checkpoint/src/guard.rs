//! Scoped checkpoint ownership.

use tracing::warn;

use crate::checkpoint::Checkpoint;
use crate::error::CheckpointError;

/// Keeps a checkpoint enabled until dropped.
///
/// Dropping the guard disables the checkpoint. Use [`release`](Self::release)
/// to see the error from `disable` instead of having it logged.
#[derive(Debug)]
#[must_use = "the checkpoint is disabled as soon as the guard is dropped"]
pub struct CheckpointGuard<'a> {
    checkpoint: &'a Checkpoint,
    released: bool,
}

impl CheckpointGuard<'_> {
    /// The guarded checkpoint.
    pub fn checkpoint(&self) -> &Checkpoint {
        self.checkpoint
    }

    /// Disable the checkpoint now.
    pub fn release(mut self) -> Result<(), CheckpointError> {
        self.released = true;
        self.checkpoint.disable()
    }
}

impl Drop for CheckpointGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.checkpoint.disable() {
            warn!(
                "Failed to disable checkpoint '{}' on drop: {}",
                self.checkpoint.name(),
                e
            );
        }
    }
}

impl Checkpoint {
    /// Enable the checkpoint and return a guard for it.
    ///
    /// Returns `Ok(None)` if the checkpoint is already active, either through
    /// this instance or through another holder.
    pub fn guard(&self) -> Result<Option<CheckpointGuard<'_>>, CheckpointError> {
        if !self.try_enable()? {
            return Ok(None);
        }
        Ok(Some(CheckpointGuard {
            checkpoint: self,
            released: false,
        }))
    }

    /// Run `work` unless the checkpoint is already active.
    ///
    /// The checkpoint stays enabled while `work` runs and is disabled
    /// afterwards, also if `work` panics. Returns `Ok(None)` when skipped.
    pub fn run_once<T>(&self, work: impl FnOnce() -> T) -> Result<Option<T>, CheckpointError> {
        let Some(guard) = self.guard()? else {
            return Ok(None);
        };
        let output = work();
        guard.release()?;
        Ok(Some(output))
    }
}
