//! IPC client (C5): connects to the daemon's control socket, multiplexes
//! requests by id, and times each one out after 5 seconds.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::OwnedWriteHalf;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ipc::protocol::{IpcRequest, IpcResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<IpcResponse>>>>;

/// A pure filesystem check: does the socket path exist? Used by the
/// fallback orchestrator to decide whether it's worth attempting a connect.
pub fn server_running(socket_path: &Path) -> bool {
    socket_path.exists()
}

pub struct IpcClient {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: Pending,
    next_id: AtomicU64,
    reader_task: JoinHandle<()>,
}

impl IpcClient {
    /// Returns a connected client, or `None` if the connect itself fails —
    /// never raises, matching the fallback orchestrator's fast-path check.
    pub async fn try_connect(socket_path: &Path) -> Option<Self> {
        Self::connect(socket_path).await.ok()
    }

    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        let reader_pending = pending.clone();
        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        let response: IpcResponse = match serde_json::from_str(trimmed) {
                            Ok(r) => r,
                            Err(e) => {
                                debug!(error = %e, "dropping malformed ipc response");
                                continue;
                            }
                        };
                        if let Some(sender) = reader_pending.lock().remove(&response.id) {
                            let _ = sender.send(response);
                        }
                    }
                }
            }
            // Connection closed: reject everyone still waiting.
            for (_, sender) in reader_pending.lock().drain() {
                drop(sender); // dropped sender -> receiver sees a RecvError, mapped to ConnectionClosed below
            }
        });

        Ok(Self {
            writer: tokio::sync::Mutex::new(write_half),
            pending,
            next_id: AtomicU64::new(1),
            reader_task,
        })
    }

    fn next_request_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Sends `{id, method, params}` and awaits the matching response by id,
    /// timing out after 5 seconds.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<IpcResponse> {
        let id = self.next_request_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        let request = IpcRequest { id: id.clone(), method: method.to_string(), params };
        let mut payload = serde_json::to_vec(&request)?;
        payload.push(b'\n');

        {
            let mut writer = self.writer.lock().await;
            if writer.write_all(&payload).await.is_err() {
                self.pending.lock().remove(&id);
                return Err(Error::ConnectionClosed);
            }
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_recv_error)) => Err(Error::ConnectionClosed),
            Err(_timeout) => {
                self.pending.lock().remove(&id);
                Err(Error::RequestTimeout)
            }
        }
    }

    /// Unwraps the response envelope, turning a present `error` field into
    /// `Err`.
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let response = self.request(method, params).await?;
        match response.error {
            Some(message) => Err(Error::Other(message)),
            None => Ok(response.result.unwrap_or(Value::Null)),
        }
    }

    pub async fn get_prices(&self, coin: Option<&str>) -> Result<Value> {
        let params = coin.map(|c| serde_json::json!({ "coin": c }));
        self.call("getPrices", params).await
    }

    pub async fn get_asset_ctxs(&self) -> Result<Value> {
        self.call("getAssetCtxs", None).await
    }

    pub async fn get_perp_meta(&self) -> Result<Value> {
        self.call("getPerpMeta", None).await
    }

    pub async fn get_status(&self) -> Result<Value> {
        self.call("getStatus", None).await
    }

    pub async fn shutdown(&self) -> Result<Value> {
        self.call("shutdown", None).await
    }
}

impl Drop for IpcClient {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn server_running_reflects_socket_file_presence() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("server.sock");
        assert!(!server_running(&socket_path));
        std::fs::write(&socket_path, b"").unwrap();
        assert!(server_running(&socket_path));
    }

    #[tokio::test]
    async fn try_connect_returns_none_without_raising_when_nothing_listens() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("server.sock");
        assert!(IpcClient::try_connect(&socket_path).await.is_none());
    }

    #[tokio::test]
    async fn round_trip_against_a_real_unix_listener() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("server.sock");
        let listener = tokio::net::UnixListener::bind(&socket_path).unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let request: IpcRequest = serde_json::from_str(line.trim()).unwrap();
            let response = IpcResponse::ok(request.id, serde_json::json!({ "ok": true }));
            let mut payload = serde_json::to_vec(&response).unwrap();
            payload.push(b'\n');
            write_half.write_all(&payload).await.unwrap();
        });

        let client = IpcClient::connect(&socket_path).await.unwrap();
        let result = client.shutdown().await.unwrap();
        assert_eq!(result, serde_json::json!({ "ok": true }));
    }

    #[tokio::test]
    async fn pending_requests_reject_on_connection_close() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("server.sock");
        let listener = tokio::net::UnixListener::bind(&socket_path).unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream); // close immediately without responding
        });

        let client = IpcClient::connect(&socket_path).await.unwrap();
        let err = client.get_status().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
