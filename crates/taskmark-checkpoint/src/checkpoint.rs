//! File-backed checkpoint marker.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::CheckpointConfig;
use crate::error::CheckpointError;
use crate::probe::{probe_for, ActivityProbe};
use crate::waiter::Waiter;

/// Extension appended to every checkpoint name.
pub const CHECKPOINT_EXTENSION: &str = "checkpoint";

/// A named marker telling processes that a piece of work is in progress.
///
/// Enabling a checkpoint creates `<directory>/<name>.checkpoint` and parks a
/// background thread that keeps the file open and locked until the
/// checkpoint is disabled. Any process can then ask [`Checkpoint::is_enabled`]
/// before starting the same work.
///
/// All operations take `&self`, so one instance can be shared between threads
/// through an `Arc`. Each instance owns at most one waiter.
///
/// Dropping an enabled checkpoint releases its waiter but leaves the file in
/// place, the same as a process that exits without calling `disable`.
#[derive(Debug)]
pub struct Checkpoint {
    name: String,
    path: PathBuf,
    config: CheckpointConfig,
    probe: Arc<dyn ActivityProbe>,
    waiter: Mutex<Option<Waiter>>,
}

impl Checkpoint {
    /// Create a checkpoint with the default configuration.
    pub fn new(directory: impl AsRef<Path>, name: &str) -> Result<Self, CheckpointError> {
        Self::with_config(directory, name, CheckpointConfig::default())
    }

    /// Create a checkpoint with an explicit configuration.
    pub fn with_config(
        directory: impl AsRef<Path>,
        name: &str,
        config: CheckpointConfig,
    ) -> Result<Self, CheckpointError> {
        config.validate()?;
        let probe = probe_for(config.probe);
        Self::build(directory.as_ref(), name, config, probe)
    }

    /// Create a checkpoint that uses a custom activity probe.
    pub fn with_probe(
        directory: impl AsRef<Path>,
        name: &str,
        probe: Arc<dyn ActivityProbe>,
    ) -> Result<Self, CheckpointError> {
        Self::build(directory.as_ref(), name, CheckpointConfig::default(), probe)
    }

    fn build(
        directory: &Path,
        name: &str,
        config: CheckpointConfig,
        probe: Arc<dyn ActivityProbe>,
    ) -> Result<Self, CheckpointError> {
        if directory.as_os_str().is_empty() {
            return Err(CheckpointError::InvalidArgument(
                "Directory cannot be empty".to_string(),
            ));
        }
        validate_name(name)?;

        Ok(Self {
            name: name.to_string(),
            path: directory.join(format!("{name}.{CHECKPOINT_EXTENSION}")),
            config,
            probe,
            waiter: Mutex::new(None),
        })
    }

    /// Get the checkpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the checkpoint file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the configuration in use.
    pub fn config(&self) -> &CheckpointConfig {
        &self.config
    }

    /// Whether this instance currently owns a waiter.
    pub fn is_held(&self) -> bool {
        self.waiter.lock().is_some()
    }

    /// Enable the checkpoint. Does nothing if it is already active, whether
    /// through this instance or another holder.
    pub fn enable(&self) -> Result<(), CheckpointError> {
        self.try_enable().map(|_| ())
    }

    /// Enable the checkpoint and report whether this call took it.
    ///
    /// Returns `Ok(false)` when this instance already holds it or when the
    /// probe sees another holder.
    pub fn try_enable(&self) -> Result<bool, CheckpointError> {
        let mut slot = self.waiter.lock();
        if slot.is_some() {
            debug!("Checkpoint '{}' already held by this instance", self.name);
            return Ok(false);
        }

        if self.exists() && self.probe.is_active(&self.path) {
            info!(
                "Checkpoint '{}' is active elsewhere ({} probe)",
                self.name,
                self.probe.name()
            );
            return Ok(false);
        }

        self.remove_file()?;
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| CheckpointError::FileCreation {
                path: self.path.clone(),
                source,
            })?;

        let waiter = self.start_waiter()?;
        *slot = Some(waiter);

        info!("Checkpoint enabled: {}", self.path.display());
        Ok(true)
    }

    /// Disable the checkpoint: release the waiter and remove the file.
    /// Does nothing if this instance never enabled it.
    pub fn disable(&self) -> Result<(), CheckpointError> {
        let mut slot = self.waiter.lock();
        let Some(waiter) = slot.take() else {
            debug!("Checkpoint '{}' not held, nothing to disable", self.name);
            return Ok(());
        };

        waiter.release(self.config.release_timeout())?;
        self.remove_file()?;

        info!("Checkpoint disabled: {}", self.path.display());
        Ok(())
    }

    /// Check if the checkpoint file is present.
    ///
    /// Says nothing about who created it; a leftover file from a dead process
    /// looks the same as a live one.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Check if the checkpoint is active, here or in another process.
    pub fn is_enabled(&self) -> bool {
        if !self.exists() {
            return false;
        }

        if self.waiter.lock().as_ref().is_some_and(Waiter::is_parked) {
            return true;
        }

        let active = self.probe.is_active(&self.path);
        debug!(
            "Probe '{}' reports {} as {}",
            self.probe.name(),
            self.path.display(),
            if active { "active" } else { "inactive" }
        );
        active
    }

    /// Remove the checkpoint file if present.
    ///
    /// Call [`disable`](Self::disable) first; deleting an enabled checkpoint
    /// leaves its waiter holding an unlinked file.
    pub fn delete(&self) -> Result<(), CheckpointError> {
        if self.is_held() {
            warn!(
                "Deleting checkpoint '{}' while its waiter is still running",
                self.name
            );
        }
        self.remove_file()
    }

    /// Spawn the waiter for a freshly created marker. On failure the marker
    /// is removed so it does not pass for a leftover from another process.
    fn start_waiter(&self) -> Result<Waiter, CheckpointError> {
        match Waiter::spawn(
            &self.path,
            format!("checkpoint-{}", self.name),
            self.config.ready_timeout(),
        ) {
            Ok(waiter) => Ok(waiter),
            Err(e) => {
                if let Err(cleanup) = self.remove_file() {
                    warn!(
                        "Failed to remove checkpoint file after waiter error: {}",
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    fn remove_file(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::FileRemoval {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn validate_name(name: &str) -> Result<(), CheckpointError> {
    if name.trim().is_empty() {
        return Err(CheckpointError::InvalidArgument(
            "Name cannot be empty".to_string(),
        ));
    }

    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains(['/', '\\']) {
        return Err(CheckpointError::InvalidArgument(format!(
            "Name must be a plain file name: {name}"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
