//! Background waiter that keeps a checkpoint file open.
//!
//! The waiter thread opens the marker, takes an exclusive advisory lock on it,
//! reports [`WaiterEvent::Ready`] and then parks on a release channel. It
//! wakes when [`Waiter::release`] sends the signal or when the [`Waiter`] is
//! dropped (the sender disconnects). Either way it unlocks, closes the file
//! and reports [`WaiterEvent::Released`].

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::CheckpointError;

/// Messages sent from the waiter thread back to its owner.
#[derive(Debug)]
enum WaiterEvent {
    /// File is open and locked; the thread is parked.
    Ready,
    /// The file could not be opened or locked.
    Failed(std::io::Error),
    /// The file has been closed and the thread is about to exit.
    Released,
}

/// Handle to a running waiter thread.
#[derive(Debug)]
pub(crate) struct Waiter {
    path: PathBuf,
    release_tx: Option<Sender<()>>,
    event_rx: Receiver<WaiterEvent>,
    parked: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Waiter {
    /// Spawn a waiter for `path` and block until it is parked.
    pub(crate) fn spawn(
        path: &Path,
        thread_name: String,
        ready_timeout: Duration,
    ) -> Result<Self, CheckpointError> {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (event_tx, event_rx) = mpsc::channel();
        let parked = Arc::new(AtomicBool::new(false));

        let handle = {
            let path = path.to_path_buf();
            let parked = Arc::clone(&parked);
            thread::Builder::new()
                .name(thread_name)
                .spawn(move || hold(&path, &release_rx, &event_tx, &parked))?
        };

        let mut waiter = Self {
            path: path.to_path_buf(),
            release_tx: Some(release_tx),
            event_rx,
            parked,
            handle: Some(handle),
        };

        match waiter.event_rx.recv_timeout(ready_timeout) {
            Ok(WaiterEvent::Ready) => {
                debug!("Waiter parked on {}", waiter.path.display());
                Ok(waiter)
            }
            Ok(WaiterEvent::Failed(source)) => {
                waiter.join();
                Err(CheckpointError::WaiterIo {
                    path: waiter.path.clone(),
                    source,
                })
            }
            Ok(WaiterEvent::Released) => Err(CheckpointError::Cancelled(format!(
                "waiter for {} exited before it was ready",
                waiter.path.display()
            ))),
            Err(RecvTimeoutError::Timeout) => Err(CheckpointError::Cancelled(format!(
                "waiter for {} not ready after {:?}",
                waiter.path.display(),
                ready_timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                waiter.join();
                Err(CheckpointError::Cancelled(format!(
                    "waiter for {} died before it was ready",
                    waiter.path.display()
                )))
            }
        }
    }

    /// Whether the thread currently holds the file and is parked.
    pub(crate) fn is_parked(&self) -> bool {
        self.parked.load(Ordering::Acquire)
    }

    /// Signal the waiter, wait for it to close the file, then join it.
    pub(crate) fn release(mut self, timeout: Duration) -> Result<(), CheckpointError> {
        if let Some(tx) = self.release_tx.take() {
            // A send error only means the thread is already gone.
            let _ = tx.send(());
        }

        match self.event_rx.recv_timeout(timeout) {
            Ok(WaiterEvent::Released) => {}
            Ok(other) => {
                debug!("Unexpected waiter event during release: {:?}", other);
            }
            Err(RecvTimeoutError::Timeout) => {
                return Err(CheckpointError::Cancelled(format!(
                    "waiter for {} did not release within {:?}",
                    self.path.display(),
                    timeout
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {}
        }

        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                CheckpointError::Cancelled(format!(
                    "waiter thread for {} panicked",
                    self.path.display()
                ))
            }),
            None => Ok(()),
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Waiter thread for {} panicked", self.path.display());
            }
        }
    }
}

/// Body of the waiter thread.
fn hold(
    path: &Path,
    release_rx: &Receiver<()>,
    event_tx: &Sender<WaiterEvent>,
    parked: &AtomicBool,
) {
    let file = match open_and_lock(path) {
        Ok(file) => file,
        Err(e) => {
            let _ = event_tx.send(WaiterEvent::Failed(e));
            return;
        }
    };

    parked.store(true, Ordering::Release);
    if event_tx.send(WaiterEvent::Ready).is_err() {
        // Owner gave up waiting for us.
        parked.store(false, Ordering::Release);
        return;
    }

    // Ok(()) is an explicit release, Err means the owner was dropped.
    let _ = release_rx.recv();
    parked.store(false, Ordering::Release);

    if let Err(e) = FileExt::unlock(&file) {
        debug!("Failed to unlock {}: {}", path.display(), e);
    }
    drop(file);

    let _ = event_tx.send(WaiterEvent::Released);
}

fn open_and_lock(path: &Path) -> std::io::Result<File> {
    let file = open_for_hold(path)?;
    FileExt::try_lock_exclusive(&file)?;
    Ok(file)
}

#[cfg(windows)]
fn open_for_hold(path: &Path) -> std::io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    // FILE_SHARE_READ | FILE_SHARE_WRITE, without FILE_SHARE_DELETE, so other
    // processes cannot delete the marker while it is held.
    OpenOptions::new().read(true).share_mode(0x1 | 0x2).open(path)
}

#[cfg(not(windows))]
fn open_for_hold(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

#[cfg(test)]
#[path = "waiter_tests.rs"]
mod tests;
