//! Filesystem conventions for the daemon's runtime directory.
//!
//! Everything the daemon and CLI share lives under `~/.hl/`: the control
//! socket, the pid file, the append-only log, a JSON echo of the startup
//! options, the optional runtime config, and the user config store.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Returns `~/.hl`, creating it if it doesn't exist yet.
pub fn hl_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| Error::Config("could not determine home directory".into()))?;
    let dir = home.join(".hl");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

pub fn server_socket_path() -> Result<PathBuf> {
    Ok(hl_dir()?.join("server.sock"))
}

pub fn server_pid_path() -> Result<PathBuf> {
    Ok(hl_dir()?.join("server.pid"))
}

pub fn server_log_path() -> Result<PathBuf> {
    Ok(hl_dir()?.join("server.log"))
}

/// Startup-options echo file (`{testnet, startedAt}`), written once at launch.
pub fn server_json_path() -> Result<PathBuf> {
    Ok(hl_dir()?.join("server.json"))
}

pub fn user_config_path() -> Result<PathBuf> {
    Ok(hl_dir()?.join("user-config.json"))
}

/// Optional runtime tunables file; absence is not an error.
pub fn runtime_config_path() -> Result<PathBuf> {
    Ok(hl_dir()?.join("config.toml"))
}
