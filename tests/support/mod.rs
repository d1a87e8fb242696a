//! Shared helpers for the integration test binaries. Each `tests/*.rs` file
//! is its own process, so setting `$HOME` per `assert_cmd::Command` (rather
//! than mutating it process-wide) is what keeps these hermetic under
//! parallel test execution.

use std::path::PathBuf;

use tempfile::TempDir;

/// A throwaway `$HOME` with nothing under `.hl/` yet.
pub fn fresh_home() -> TempDir {
    tempfile::tempdir().expect("create temp home")
}

pub fn hl_dir(home: &TempDir) -> PathBuf {
    home.path().join(".hl")
}
