//! End-to-end tests for the checkpoint lifecycle.
//!
//! These go through the public API only, including one test that holds a
//! checkpoint from a separate process.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use taskmark_checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointError, ErrorKind, ProbeKind,
};

const CHILD_DIR_ENV: &str = "TASKMARK_CHILD_CHECKPOINT_DIR";
const CHILD_READY: &str = "checkpoint-child-ready";

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_job_a_scenario() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("tmp");
    fs::create_dir(&dir).unwrap();

    let checkpoint = Checkpoint::new(&dir, "job-A").unwrap();
    checkpoint.enable().unwrap();

    let marker = dir.join("job-A.checkpoint");
    assert!(marker.exists());
    assert!(checkpoint.is_enabled());

    checkpoint.disable().unwrap();
    assert!(!marker.exists());
    assert!(!checkpoint.is_enabled());
}

#[test]
fn test_disable_right_after_construction() {
    let root = TempDir::new().unwrap();
    let checkpoint = Checkpoint::new(root.path(), "job-B").unwrap();

    checkpoint.disable().unwrap();

    assert!(!checkpoint.exists());
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_enable_disable_delete() {
    let root = TempDir::new().unwrap();
    let checkpoint = Checkpoint::new(root.path(), "cp-test").unwrap();

    checkpoint.enable().unwrap();
    assert!(checkpoint.exists());
    checkpoint.disable().unwrap();
    checkpoint.delete().unwrap();

    assert!(!checkpoint.exists());
}

#[test]
fn test_constructor_validation() {
    assert!(matches!(
        Checkpoint::new("", "name"),
        Err(CheckpointError::InvalidArgument(_))
    ));
    assert_eq!(
        Checkpoint::new(".", "").unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert!(Checkpoint::new(".", "valid-name").is_ok());
}

#[test]
fn test_shared_instance_single_waiter() {
    let root = TempDir::new().unwrap();
    let checkpoint = Arc::new(Checkpoint::new(root.path(), "shared").unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let checkpoint = Arc::clone(&checkpoint);
            thread::spawn(move || checkpoint.try_enable().unwrap())
        })
        .collect();

    let owners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|took| *took)
        .count();
    assert_eq!(owners, 1);
    assert!(checkpoint.is_enabled());

    checkpoint.disable().unwrap();
    assert!(!checkpoint.exists());
}

#[test]
fn test_legacy_probe_config_from_toml() {
    let root = TempDir::new().unwrap();
    let config = CheckpointConfig::load_str(
        r#"
            probe = "delete_recreate"
            ready_timeout_ms = 2000
        "#,
    )
    .unwrap();
    assert_eq!(config.probe, ProbeKind::DeleteRecreate);

    let checkpoint = Checkpoint::with_config(root.path(), "legacy", config).unwrap();
    checkpoint.enable().unwrap();
    assert!(checkpoint.is_enabled());
    checkpoint.disable().unwrap();
    assert!(!checkpoint.is_enabled());
}

// ============================================================================
// Cross-process
// ============================================================================

/// Child side of `test_other_process_holder`. Does nothing unless spawned by it.
#[test]
fn child_holder() {
    let Ok(dir) = std::env::var(CHILD_DIR_ENV) else {
        return;
    };

    let checkpoint = Checkpoint::new(&dir, "cross-process").unwrap();
    checkpoint.enable().unwrap();

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", CHILD_READY).unwrap();
    stdout.flush().unwrap();

    let mut line = String::new();
    std::io::stdin().read_line(&mut line).unwrap();

    checkpoint.disable().unwrap();
}

#[test]
fn test_other_process_holder() {
    let root = TempDir::new().unwrap();
    let exe = std::env::current_exe().unwrap();

    let mut child = Command::new(exe)
        .args(["child_holder", "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_DIR_ENV, root.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();
    let ready = lines
        .by_ref()
        .map_while(Result::ok)
        .any(|line| line.contains(CHILD_READY));
    assert!(ready, "child never enabled its checkpoint");

    let observer = Checkpoint::new(root.path(), "cross-process").unwrap();
    assert!(observer.exists());
    assert!(observer.is_enabled());
    assert!(!observer.try_enable().unwrap());

    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin).unwrap();
    drop(stdin);

    // Keep reading so the child's test harness can finish writing
    for _ in lines {}
    assert!(child.wait().unwrap().success());
    assert!(!observer.exists());
    assert!(!observer.is_enabled());
}
