//! Integration coverage for C4 (daemon lifecycle) that needs a real `$HOME`
//! and a real (if fake) child process, which the colocated unit tests in
//! `src/daemon/lifecycle.rs` deliberately avoid exercising together.
//!
//! Everything here runs in a single test function: `$HOME` is process-wide
//! state, and `cargo test` runs test functions within one binary on separate
//! threads by default, so spreading these across multiple `#[tokio::test]`
//! functions would race on it.

use std::time::Duration;

use hlmirrord::daemon::lifecycle;
use hlmirrord::error::Error;

#[tokio::test]
async fn daemon_start_detached_lifecycle_scenarios() {
    let original_home = std::env::var_os("HOME");

    // Scenario 1: the given binary exits immediately without ever creating
    // the control socket, so `start_detached` should time out rather than
    // hang.
    {
        let home = tempfile::tempdir().unwrap();
        std::env::set_var("HOME", home.path());

        let result = lifecycle::start_detached(false, std::path::Path::new("/bin/true"), Duration::from_millis(300))
            .await;
        assert!(matches!(result, Err(Error::StartupTimeout)), "expected StartupTimeout, got {result:?}");
    }

    // Scenario 2: a live PID already recorded under this $HOME is reported
    // as already running, and `start_detached` never even spawns the child.
    {
        let home = tempfile::tempdir().unwrap();
        std::env::set_var("HOME", home.path());
        let hl_dir = home.path().join(".hl");
        std::fs::create_dir_all(&hl_dir).unwrap();
        std::fs::write(hl_dir.join("server.pid"), std::process::id().to_string()).unwrap();

        let result = lifecycle::start_detached(false, std::path::Path::new("/bin/true"), Duration::from_millis(300))
            .await;
        assert!(
            matches!(result, Err(Error::AlreadyRunning(pid)) if pid == std::process::id()),
            "expected AlreadyRunning, got {result:?}"
        );
    }

    // Scenario 3: a PID file naming a dead process is treated as stale and
    // cleared, so `start_detached` proceeds (and then still times out, for
    // the same reason as scenario 1).
    {
        let home = tempfile::tempdir().unwrap();
        std::env::set_var("HOME", home.path());
        let hl_dir = home.path().join(".hl");
        std::fs::create_dir_all(&hl_dir).unwrap();
        let pid_path = hl_dir.join("server.pid");
        std::fs::write(&pid_path, (u32::MAX - 1).to_string()).unwrap();

        let result = lifecycle::start_detached(false, std::path::Path::new("/bin/true"), Duration::from_millis(300))
            .await;
        assert!(matches!(result, Err(Error::StartupTimeout)), "expected StartupTimeout, got {result:?}");
        assert!(!pid_path.exists(), "stale pid file should have been removed");
    }

    match original_home {
        Some(home) => std::env::set_var("HOME", home),
        None => std::env::remove_var("HOME"),
    }
}
