//! Cross-process activity probes.
//!
//! A waiter's parked state is only visible inside the process that owns it.
//! Other processes need an OS-level signal to tell whether someone is holding
//! a checkpoint file, and that signal is platform dependent:
//!
//! - [`AdvisoryLockProbe`] tries to take an exclusive advisory lock on the
//!   marker file. Waiters always hold such a lock, so contention means a live
//!   holder. Works on Unix and Windows, but only against holders that also
//!   lock (advisory locks are cooperative).
//! - [`DeleteRecreateProbe`] deletes the file and creates it again. A refusal
//!   to delete is read as "someone has it open". This only detects anything on
//!   platforms that forbid unlinking open files (Windows). On POSIX systems an
//!   open file can always be unlinked, so the probe reports inactive. It is
//!   also destructive and not atomic, so it is kept for compatibility only.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use fs2::FileExt;
use tracing::{debug, warn};

use crate::config::ProbeKind;

/// Detects whether a checkpoint file is held by anyone else.
pub trait ActivityProbe: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if another holder appears to have the file open.
    ///
    /// Failures are folded into the answer: anything the probe cannot
    /// explain counts as "active".
    fn is_active(&self, path: &Path) -> bool;
}

/// Build the probe selected by configuration.
pub fn probe_for(kind: ProbeKind) -> Arc<dyn ActivityProbe> {
    match kind {
        ProbeKind::AdvisoryLock => Arc::new(AdvisoryLockProbe),
        ProbeKind::DeleteRecreate => Arc::new(DeleteRecreateProbe),
    }
}

/// Probe based on exclusive advisory file locks (`flock` / `LockFileEx`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisoryLockProbe;

impl ActivityProbe for AdvisoryLockProbe {
    fn name(&self) -> &'static str {
        "advisory_lock"
    }

    fn is_active(&self, path: &Path) -> bool {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return false,
            Err(e) => {
                debug!("Cannot open {} for probing: {}", path.display(), e);
                return true;
            }
        };

        // Call through the trait explicitly; newer std has inherent File lock
        // methods with different signatures.
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                if let Err(e) = FileExt::unlock(&file) {
                    debug!("Failed to unlock probe handle on {}: {}", path.display(), e);
                }
                false
            }
            Err(e) if is_contended(&e) => true,
            Err(e) => {
                warn!("Lock probe failed on {}: {}", path.display(), e);
                true
            }
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Legacy probe: delete the marker and recreate it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteRecreateProbe;

impl ActivityProbe for DeleteRecreateProbe {
    fn name(&self) -> &'static str {
        "delete_recreate"
    }

    fn is_active(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return false,
            Err(e) => {
                debug!("Delete refused for {}: {}", path.display(), e);
                return true;
            }
        }

        // Someone else recreating it first is fine.
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => false,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => false,
            Err(e) => {
                warn!("Failed to restore {} after probe: {}", path.display(), e);
                true
            }
        }
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
