//! Narrower checks on the `--json` vs. human-readable output split.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;

fn hl() -> Command {
    Command::cargo_bin("hl").unwrap()
}

#[test]
fn human_readable_config_list_is_not_json() {
    let home = support::fresh_home();
    hl().env("HOME", home.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("slippage"))
        .stdout(predicate::str::contains("User Config"));
}

#[test]
fn json_mode_status_error_still_goes_to_stderr_as_plain_text() {
    let home = support::fresh_home();
    hl().env("HOME", home.path())
        .args(["--json", "server", "status"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error:"));
}
