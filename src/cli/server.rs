//! `server start|stop|status` command handlers: wire C4 (lifecycle) and C5
//! (IPC client) into the CLI.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::output;
use crate::daemon::lifecycle;
use crate::error::{Error, Result};
use crate::ipc::client::IpcClient;
use crate::paths;

const READY_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Locates the `hl-server` binary next to the currently running `hl`
/// executable — both are installed together by every distribution channel
/// this crate ships (cargo install, binstall tarball, package managers).
fn server_binary_path() -> Result<PathBuf> {
    let mut path = std::env::current_exe()?;
    let name = if cfg!(windows) { "hl-server.exe" } else { "hl-server" };
    path.set_file_name(name);
    Ok(path)
}

pub async fn execute_start(testnet: bool, json: bool) -> Result<()> {
    let server_binary = server_binary_path()?;
    let spinner = (!json).then(|| output::spinner("waiting for daemon to become ready"));

    let result = lifecycle::start_detached(testnet, &server_binary, READY_TIMEOUT).await;

    if let Some(pb) = &spinner {
        match &result {
            Ok(()) => output::spinner_success(pb, "daemon ready"),
            Err(e) => output::spinner_fail(pb, &e.to_string()),
        }
    }
    result?;

    if json {
        println!("{}", serde_json::json!({ "ok": true, "testnet": testnet }));
    }
    Ok(())
}

pub async fn execute_stop(json: bool) -> Result<()> {
    let socket_path = paths::server_socket_path()?;
    let pid_path = paths::server_pid_path()?;

    if let Some(client) = IpcClient::try_connect(&socket_path).await {
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, client.shutdown()).await;
    } else if let Some(pid) = lifecycle::read_pid_file(&pid_path) {
        lifecycle::force_stop(pid)?;
    } else {
        return Err(Error::NotRunning);
    }

    if json {
        println!("{}", serde_json::json!({ "ok": true }));
    } else {
        output::success("daemon stopped");
    }
    Ok(())
}

pub async fn execute_status(json: bool) -> Result<()> {
    let socket_path = paths::server_socket_path()?;
    let client = IpcClient::try_connect(&socket_path).await.ok_or(Error::NotRunning)?;
    let status = client.get_status().await?;

    if json {
        println!("{status}");
        return Ok(());
    }

    output::section("Server Status");
    output::field("running", status["running"]);
    output::field("testnet", status["testnet"]);
    output::field("connected", output::connection_indicator(status["connected"].as_bool().unwrap_or(false)));
    output::field("uptime", format!("{}ms", status["uptime"].as_i64().unwrap_or(0)));

    output::section("Cache");
    for (label, key) in [("mids", "mids"), ("assetCtxs", "assetCtxs"), ("perpMetas", "perpMetas")] {
        let slot = &status["cache"][key];
        let present = slot["present"].as_bool().unwrap_or(false);
        let age_ms = slot["ageMs"].as_i64();
        output::field(label, output::cache_slot_indicator(present, age_ms));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_binary_path_is_sibling_of_current_exe() {
        let mut expected = std::env::current_exe().unwrap();
        let name = if cfg!(windows) { "hl-server.exe" } else { "hl-server" };
        expected.set_file_name(name);
        assert_eq!(server_binary_path().unwrap(), expected);
    }
}
