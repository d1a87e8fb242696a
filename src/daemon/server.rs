//! IPC server (C3): accepts connections on the control socket, frames
//! newline-delimited JSON requests, and dispatches to cache reads and the
//! `shutdown` control operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::daemon::state::DaemonState;
use crate::error::{Error, Result};
use crate::ipc::protocol::{IpcRequest, IpcResponse};

/// Everything a connection handler needs to answer a request.
pub struct ServerContext {
    pub state: Arc<DaemonState>,
    /// Flipped by the `shutdown` method; the accept loop and every open
    /// connection observe it and close.
    pub shutdown_tx: watch::Sender<bool>,
}

pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl IpcServer {
    /// Binds the control socket, unlinking any stale file left behind by a
    /// crashed previous instance first.
    pub async fn bind(path: &Path) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        Ok(Self { listener, socket_path: path.to_path_buf() })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Runs the accept loop until `shutdown_rx` observes `true`. Every
    /// accepted connection is handled on its own task and shares the same
    /// shutdown signal, so an in-flight `shutdown` request closes every peer.
    pub async fn run(self, ctx: Arc<ServerContext>, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("ipc server accept loop stopping");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let ctx = ctx.clone();
                            let shutdown_rx = shutdown_rx.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, ctx, shutdown_rx).await;
                            });
                        }
                        Err(e) => warn!(error = %e, "failed to accept ipc connection"),
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    stream: UnixStream,
    ctx: Arc<ServerContext>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let read = tokio::select! {
            _ = shutdown_rx.changed() => break,
            read = reader.read_line(&mut line) => read,
        };

        let bytes_read = match read {
            Ok(0) => break, // peer closed
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "ipc connection read error, closing");
                break;
            }
        };
        let _ = bytes_read;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, "dropping malformed ipc line");
                continue;
            }
        };

        let is_shutdown = request.method == "shutdown";
        let response = handle_request(&ctx, request);

        let mut payload = serde_json::to_vec(&response).unwrap_or_default();
        payload.push(b'\n');
        if writer.write_all(&payload).await.is_err() {
            break;
        }

        if is_shutdown {
            let _ = ctx.shutdown_tx.send(true);
            break;
        }
    }
}

fn handle_request(ctx: &ServerContext, request: IpcRequest) -> IpcResponse {
    let id = request.id;
    match request.method.as_str() {
        "getPrices" => {
            let coin = request
                .params
                .as_ref()
                .and_then(|p| p.get("coin"))
                .and_then(|c| c.as_str())
                .map(|c| c.to_uppercase());

            match ctx.state.cache.get_mids() {
                None => IpcResponse::err(id, Error::CacheMiss.to_string()),
                Some((mids, cached_at)) => match coin {
                    None => IpcResponse::ok_cached(id, serde_json::to_value(mids).unwrap(), cached_at),
                    Some(coin) => match mids.get(&coin) {
                        Some(price) => {
                            let mut single = serde_json::Map::new();
                            single.insert(coin, serde_json::Value::String(price.clone()));
                            IpcResponse::ok_cached(id, serde_json::Value::Object(single), cached_at)
                        }
                        None => IpcResponse::err(id, Error::UnknownCoin(coin).to_string()),
                    },
                },
            }
        }
        "getAssetCtxs" => match ctx.state.cache.get_asset_ctxs() {
            None => IpcResponse::err(id, Error::CacheMiss.to_string()),
            Some((ctxs, cached_at)) => {
                IpcResponse::ok_cached(id, serde_json::to_value(ctxs).unwrap(), cached_at)
            }
        },
        "getPerpMeta" => match ctx.state.cache.get_perp_metas() {
            None => IpcResponse::err(id, Error::CacheMiss.to_string()),
            Some((metas, cached_at)) => {
                IpcResponse::ok_cached(id, serde_json::to_value(metas).unwrap(), cached_at)
            }
        },
        "getStatus" => {
            let status = serde_json::json!({
                "running": true,
                "testnet": ctx.state.testnet,
                "connected": ctx.state.connected(),
                "startedAt": ctx.state.started_at,
                "uptime": ctx.state.uptime_ms(),
                "cache": ctx.state.cache.status(),
            });
            IpcResponse::ok(id, status)
        }
        "shutdown" => IpcResponse::ok(id, serde_json::json!({ "ok": true })),
        other => IpcResponse::err(id, Error::UnknownMethod(other.to_string()).to_string()),
    }
}
