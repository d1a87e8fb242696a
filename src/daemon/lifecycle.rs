//! Daemon lifecycle (C4): PID/socket/log file management, foreground vs.
//! detached startup, and graceful shutdown ordering.

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cache::Cache;
use crate::config::RuntimeConfig;
use crate::daemon::server::{IpcServer, ServerContext};
use crate::daemon::state::DaemonState;
use crate::daemon::subscription::SubscriptionManager;
use crate::error::{Error, Result};
use crate::exchange::http::HttpInfoClient;
use crate::exchange::reconnecting::ReconnectingPushTransport;
use crate::exchange::ws::WsPushTransport;
use crate::paths;

/// Wires `tracing` to write to both stderr and `server.log` (append-only).
///
/// Returns the non-blocking writer's guard; the caller must hold it for the
/// lifetime of the process — dropping it flushes and closes the log file,
/// which is why `hl-server`'s `main` keeps it bound until `run_foreground`
/// returns.
pub fn init_foreground_logging(log_path: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let file = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).init();

    Ok(guard)
}

/// Returns true if `pid` refers to a live process on this host.
///
/// `kill(pid, 0)` sends no signal; it only performs the permission/existence
/// check, which is the only OS-backed way to confirm liveness (the file's
/// mere presence says nothing about a crash).
fn is_process_alive(pid: u32) -> bool {
    // SAFETY: libc::kill with signal 0 performs no action beyond validating
    // that `pid` exists and is signalable by this process.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

/// Reads the PID recorded in `server.pid`, if any. Used by `server stop`'s
/// filesystem-level fallback once the preferred IPC `shutdown` path has
/// already failed.
pub fn read_pid_file(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// If a PID file exists and names a live process, returns
/// `Error::AlreadyRunning`. If it exists but names a dead one, removes it
/// (stale) and returns `Ok(())`. If no file exists, returns `Ok(())`.
fn check_and_clear_stale_pid(pid_path: &Path) -> Result<()> {
    match read_pid_file(pid_path) {
        Some(pid) if is_process_alive(pid) => Err(Error::AlreadyRunning(pid)),
        Some(_stale_pid) => {
            warn!(path = %pid_path.display(), "removing stale pid file");
            let _ = std::fs::remove_file(pid_path);
            Ok(())
        }
        None => Ok(()),
    }
}

fn write_pid_file(path: &Path) -> Result<()> {
    std::fs::write(path, std::process::id().to_string())?;
    Ok(())
}

fn write_server_json(path: &Path, testnet: bool, started_at: i64) -> Result<()> {
    let body = serde_json::json!({ "testnet": testnet, "startedAt": started_at });
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, serde_json::to_vec_pretty(&body)?)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove file during cleanup");
        }
    }
}

/// Runs the daemon in the foreground until a shutdown is requested, either
/// via the `shutdown` IPC method or an interrupt/terminate signal.
///
/// Sequence: ensure the state directory exists → reject or clear a stale PID
/// → write the PID → start the subscription manager (awaits transport ready)
/// → bind the IPC socket → install signal handlers → run until shutdown →
/// stop the subscription manager → remove the socket and PID files.
pub async fn run_foreground(testnet: bool) -> Result<()> {
    let pid_path = paths::server_pid_path()?;
    let socket_path = paths::server_socket_path()?;
    let json_path = paths::server_json_path()?;

    check_and_clear_stale_pid(&pid_path)?;
    write_pid_file(&pid_path)?;

    let runtime_config = RuntimeConfig::load(&paths::runtime_config_path()?)
        .map_err(|e| Error::Config(e.to_string()))?;
    let http_timeout = Duration::from_millis(runtime_config.http_timeout_ms);

    let cache = Arc::new(Cache::new());
    let ws = if testnet { WsPushTransport::testnet() } else { WsPushTransport::mainnet() };
    let transport = ReconnectingPushTransport::new(ws, runtime_config.reconnection.clone());
    let info_client = if testnet {
        HttpInfoClient::testnet(http_timeout)?
    } else {
        HttpInfoClient::mainnet(http_timeout)?
    };

    let refresh_interval = Duration::from_millis(runtime_config.perp_meta_refresh_ms);
    let mut subscription =
        SubscriptionManager::new(transport, Arc::new(info_client), cache.clone(), refresh_interval);
    subscription.start().await?;

    let state = Arc::new(DaemonState::new(testnet, cache, subscription.connected_handle()));
    write_server_json(&json_path, testnet, state.started_at)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = IpcServer::bind(&socket_path).await?;
    let ctx = Arc::new(ServerContext { state, shutdown_tx: shutdown_tx.clone() });

    info!(testnet, socket = %socket_path.display(), "daemon ready");

    let server_task = tokio::spawn(server.run(ctx, shutdown_rx.clone()));

    wait_for_shutdown_signal(shutdown_tx, shutdown_rx).await;

    let _ = server_task.await;
    subscription.stop().await;

    remove_if_exists(&socket_path);
    remove_if_exists(&pid_path);
    info!("daemon stopped");
    Ok(())
}

/// Resolves once either the `shutdown` IPC method or an OS signal fires.
async fn wait_for_shutdown_signal(shutdown_tx: watch::Sender<bool>, mut shutdown_rx: watch::Receiver<bool>) {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                let _ = shutdown_rx.changed().await;
                return;
            }
        };
        tokio::select! {
            _ = shutdown_rx.changed() => {}
            _ = tokio::signal::ctrl_c() => { let _ = shutdown_tx.send(true); }
            _ = sigterm.recv() => { let _ = shutdown_tx.send(true); }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = shutdown_rx.changed() => {}
            _ = tokio::signal::ctrl_c() => { let _ = shutdown_tx.send(true); }
        }
    }
}

/// Spawns the daemon binary detached from the invoking terminal and waits
/// for its control socket to appear. The parent does not return until the
/// child is observed ready (or the timeout elapses).
pub async fn start_detached(testnet: bool, server_binary: &Path, ready_timeout: Duration) -> Result<()> {
    let pid_path = paths::server_pid_path()?;
    check_and_clear_stale_pid(&pid_path)?;

    let log_path = paths::server_log_path()?;
    let log_file = std::fs::OpenOptions::new().create(true).append(true).open(&log_path)?;
    let log_file_err = log_file.try_clone()?;

    let mut command = std::process::Command::new(server_binary);
    if testnet {
        command.arg("--testnet");
    }
    command.stdin(Stdio::null()).stdout(log_file).stderr(log_file_err);
    // Detach into its own process group so it survives the parent's exit
    // and isn't killed by the shell's job control (e.g. Ctrl-C in the
    // terminal that ran `server start`).
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
    command.spawn()?;

    let socket_path = paths::server_socket_path()?;
    wait_for_socket(&socket_path, ready_timeout).await
}

async fn wait_for_socket(path: &Path, timeout: Duration) -> Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    loop {
        if path.exists() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(Error::StartupTimeout);
        }
        interval.tick().await;
    }
}

/// `server stop`: preferred graceful path is left to the IPC client calling
/// `shutdown`; this is the filesystem-level fallback used once that path has
/// already failed (daemon unresponsive, or the caller has no IPC client
/// handy).
pub fn force_stop(pid: u32) -> Result<()> {
    // SAFETY: libc::kill with SIGTERM/SIGKILL are standard termination
    // requests targeting a PID this process itself tracked in server.pid.
    let sigterm_result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if sigterm_result == 0 {
        return Ok(());
    }
    let sigkill_result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
    if sigkill_result == 0 {
        Ok(())
    } else {
        Err(Error::NotRunning)
    }
}
