//! Fallback orchestrator (C6): for every cache-backed read, probe the
//! daemon once; use it if healthy; otherwise issue exactly one direct
//! upstream HTTP call. Never a retry loop — a degraded daemon must not
//! inflate a CLI invocation by a multi-second retry.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::exchange::InfoClient;
use crate::ipc::client::{server_running, IpcClient};

pub struct FallbackOrchestrator<I: InfoClient> {
    socket_path: PathBuf,
    info: Arc<I>,
}

impl<I: InfoClient> FallbackOrchestrator<I> {
    pub fn new(socket_path: PathBuf, info: Arc<I>) -> Self {
        Self { socket_path, info }
    }

    /// `None` if there's no point even trying the daemon, or the connect
    /// itself failed — callers treat either as "go straight to upstream".
    async fn daemon(&self) -> Option<IpcClient> {
        if !server_running(&self.socket_path) {
            return None;
        }
        IpcClient::try_connect(&self.socket_path).await
    }

    pub async fn get_prices(&self, coin: Option<&str>) -> Result<Value> {
        if let Some(client) = self.daemon().await {
            match client.get_prices(coin).await {
                Ok(value) => return Ok(value),
                Err(e) => debug!(error = %e, "daemon getPrices failed, falling back to upstream"),
            }
        }
        // There is no direct "all mids" HTTP operation upstream; the closest
        // equivalent is the combined meta+contexts call, whose asset
        // contexts each carry a mid price.
        self.info.meta_and_asset_ctxs().await
    }

    pub async fn get_asset_ctxs(&self) -> Result<Value> {
        if let Some(client) = self.daemon().await {
            match client.get_asset_ctxs().await {
                Ok(value) => return Ok(value),
                Err(e) => debug!(error = %e, "daemon getAssetCtxs failed, falling back to upstream"),
            }
        }
        self.info.meta_and_asset_ctxs().await
    }

    pub async fn get_perp_meta(&self) -> Result<Value> {
        if let Some(client) = self.daemon().await {
            match client.get_perp_meta().await {
                Ok(value) => return Ok(value),
                Err(e) => debug!(error = %e, "daemon getPerpMeta failed, falling back to upstream"),
            }
        }
        let metas = self.info.all_perp_metas().await?;
        Ok(serde_json::to_value(metas)?)
    }

    /// The "combined meta+contexts" read: tries the daemon's two separate
    /// cache slots over the one connection it already opened, and falls
    /// back to the upstream's single combined call only if either daemon
    /// leg fails.
    pub async fn get_meta_and_asset_ctxs(&self) -> Result<Value> {
        if let Some(client) = self.daemon().await {
            let combined: Result<Value> = async {
                let metas = client.get_perp_meta().await?;
                let ctxs = client.get_asset_ctxs().await?;
                Ok(serde_json::json!({ "meta": metas, "assetCtxs": ctxs }))
            }
            .await;
            match combined {
                Ok(value) => return Ok(value),
                Err(e) => debug!(error = %e, "daemon combined meta+contexts read failed, falling back to upstream"),
            }
        }
        self.info.meta_and_asset_ctxs().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    struct CountingInfo {
        calls: AtomicU32,
    }

    #[async_trait]
    impl InfoClient for CountingInfo {
        async fn all_perp_metas(&self) -> Result<Vec<crate::cache::PerpMarketMeta>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
        async fn meta(&self) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({ "via": "upstream" }))
        }
        async fn meta_and_asset_ctxs(&self) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({ "via": "upstream" }))
        }
        async fn spot_meta(&self) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn clearinghouse_state(&self, _user: &str) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn spot_clearinghouse_state(&self, _user: &str) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn open_orders(&self, _user: &str) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn l2_book(&self, _coin: &str) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn referral(&self, _user: &str) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn user_role(&self, _user: &str) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn extra_agents(&self, _user: &str) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn active_asset_data(&self, _user: &str, _coin: &str) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn no_socket_file_issues_exactly_one_http_call() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("server.sock"); // never created
        let info = Arc::new(CountingInfo { calls: AtomicU32::new(0) });
        let orchestrator = FallbackOrchestrator::new(socket_path, info.clone());

        orchestrator.get_perp_meta().await.unwrap();
        assert_eq!(info.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn socket_present_but_nothing_listening_still_falls_back_once() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("server.sock");
        // A stale socket file with nothing bound to it: connect will fail.
        std::fs::write(&socket_path, b"not a real socket").unwrap();

        let info = Arc::new(CountingInfo { calls: AtomicU32::new(0) });
        let orchestrator = FallbackOrchestrator::new(socket_path, info.clone());

        orchestrator.get_perp_meta().await.unwrap();
        assert_eq!(info.calls.load(Ordering::SeqCst), 1);
    }
}
