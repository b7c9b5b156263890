
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    use crate::error::ErrorKind;
    use crate::probe::{ActivityProbe, AdvisoryLockProbe};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn temp_marker() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("waiter.checkpoint");
        File::create(&path).unwrap();
        (dir, path)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + TIMEOUT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_spawn_parks_and_locks() {
        let (_dir, path) = temp_marker();
        let waiter = Waiter::spawn(&path, "checkpoint-test".into(), TIMEOUT).unwrap();

        assert!(waiter.is_parked());
        assert!(AdvisoryLockProbe.is_active(&path));

        waiter.release(TIMEOUT).unwrap();
    }

    #[test]
    fn test_release_unlocks_file() {
        let (_dir, path) = temp_marker();
        let waiter = Waiter::spawn(&path, "checkpoint-test".into(), TIMEOUT).unwrap();

        waiter.release(TIMEOUT).unwrap();

        assert!(!AdvisoryLockProbe.is_active(&path));
        // The waiter never removes the marker itself
        assert!(path.exists());
    }

    #[test]
    fn test_spawn_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.checkpoint");

        let err = Waiter::spawn(&path, "checkpoint-test".into(), TIMEOUT).unwrap_err();
        assert!(matches!(err, CheckpointError::WaiterIo { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_spawn_fails_when_already_locked() {
        let (_dir, path) = temp_marker();
        let first = Waiter::spawn(&path, "checkpoint-first".into(), TIMEOUT).unwrap();

        let err = Waiter::spawn(&path, "checkpoint-second".into(), TIMEOUT).unwrap_err();
        assert!(matches!(err, CheckpointError::WaiterIo { .. }));

        first.release(TIMEOUT).unwrap();
    }

    #[test]
    fn test_drop_releases_waiter() {
        let (_dir, path) = temp_marker();
        let waiter = Waiter::spawn(&path, "checkpoint-test".into(), TIMEOUT).unwrap();
        assert!(AdvisoryLockProbe.is_active(&path));

        drop(waiter);

        assert!(wait_until(|| !AdvisoryLockProbe.is_active(&path)));
    }

    #[test]
    fn test_thread_is_named() {
        let (_dir, path) = temp_marker();
        let waiter = Waiter::spawn(&path, "checkpoint-named".into(), TIMEOUT).unwrap();

        let name = waiter
            .handle
            .as_ref()
            .and_then(|h| h.thread().name().map(str::to_string));
        assert_eq!(name.as_deref(), Some("checkpoint-named"));

        waiter.release(TIMEOUT).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_times_out_when_open_blocks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fifo.checkpoint");
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());

        // Opening a FIFO for reading blocks until a writer shows up
        let err = Waiter::spawn(&path, "checkpoint-fifo".into(), Duration::from_millis(200))
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Cancelled(_)));
        assert_eq!(err.kind(), ErrorKind::Cancellation);

        // Unblock the abandoned thread so it can exit
        let writer = OpenOptions::new().write(true).open(&path).unwrap();
        drop(writer);
    }
