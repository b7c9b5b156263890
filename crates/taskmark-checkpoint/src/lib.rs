//! # Taskmark Checkpoint
//!
//! File-backed markers that tell independent processes (or threads) whether a
//! named piece of work is already in progress, so it runs at most once at a
//! time.
//!
//! ## Features
//!
//! - Enable/disable/delete lifecycle around a `<name>.checkpoint` file
//! - Background waiter holding the file open and locked, with a readiness
//!   handshake instead of fixed sleeps
//! - Pluggable activity probes (advisory locks by default, legacy
//!   delete/recreate for compatibility)
//! - RAII guards, run-once helpers and a tokio facade
//!
//! ## Usage
//!
//! ```rust,no_run
//! use taskmark_checkpoint::Checkpoint;
//!
//! let checkpoint = Checkpoint::new("/var/run/jobs", "nightly-report")?;
//! if let Some(report) = checkpoint.run_once(|| "done")? {
//!     println!("{report}");
//! }
//! # Ok::<(), taskmark_checkpoint::CheckpointError>(())
//! ```
//!
//! ## Platform notes
//!
//! Cross-process detection relies on the OS. The default
//! [`AdvisoryLockProbe`] only sees holders that also take advisory locks
//! (every `Checkpoint` does). The legacy [`DeleteRecreateProbe`] cannot see
//! other processes on POSIX filesystems, where open files can be unlinked.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod guard;
pub mod probe;
pub mod runtime;
mod waiter;

pub use checkpoint::{Checkpoint, CHECKPOINT_EXTENSION};
pub use config::{CheckpointConfig, ProbeKind};
pub use error::{CheckpointError, ErrorKind};
pub use guard::CheckpointGuard;
pub use probe::{ActivityProbe, AdvisoryLockProbe, DeleteRecreateProbe};
pub use runtime::AsyncCheckpoint;
