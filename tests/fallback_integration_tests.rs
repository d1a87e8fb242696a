//! The colocated unit tests in `src/fallback.rs` only cover the two
//! no-daemon fallback paths. This covers the complementary case: a real
//! daemon (real socket, real [`IpcServer`]) actually running, which the
//! orchestrator must prefer over the upstream HTTP client entirely.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hlmirrord::cache::{Cache, PerpMarketMeta};
use hlmirrord::daemon::server::{IpcServer, ServerContext};
use hlmirrord::daemon::DaemonState;
use hlmirrord::exchange::InfoClient;
use hlmirrord::fallback::FallbackOrchestrator;
use serde_json::Value;
use tempfile::tempdir;
use tokio::sync::watch;

struct NeverCalledInfo {
    calls: AtomicU32,
}

#[async_trait]
impl InfoClient for NeverCalledInfo {
    async fn all_perp_metas(&self) -> hlmirrord::error::Result<Vec<PerpMarketMeta>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
    async fn meta(&self) -> hlmirrord::error::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    }
    async fn meta_and_asset_ctxs(&self) -> hlmirrord::error::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    }
    async fn spot_meta(&self) -> hlmirrord::error::Result<Value> {
        Ok(Value::Null)
    }
    async fn clearinghouse_state(&self, _user: &str) -> hlmirrord::error::Result<Value> {
        Ok(Value::Null)
    }
    async fn spot_clearinghouse_state(&self, _user: &str) -> hlmirrord::error::Result<Value> {
        Ok(Value::Null)
    }
    async fn open_orders(&self, _user: &str) -> hlmirrord::error::Result<Value> {
        Ok(Value::Null)
    }
    async fn l2_book(&self, _coin: &str) -> hlmirrord::error::Result<Value> {
        Ok(Value::Null)
    }
    async fn referral(&self, _user: &str) -> hlmirrord::error::Result<Value> {
        Ok(Value::Null)
    }
    async fn user_role(&self, _user: &str) -> hlmirrord::error::Result<Value> {
        Ok(Value::Null)
    }
    async fn extra_agents(&self, _user: &str) -> hlmirrord::error::Result<Value> {
        Ok(Value::Null)
    }
    async fn active_asset_data(&self, _user: &str, _coin: &str) -> hlmirrord::error::Result<Value> {
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn a_healthy_daemon_serves_every_read_without_touching_upstream() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("server.sock");

    let cache = Arc::new(Cache::new());
    cache.put_mids([("BTC".to_string(), "50000".to_string())].into_iter().collect());
    cache.put_perp_metas(vec![PerpMarketMeta {
        symbol: "BTC".into(),
        sz_decimals: 4,
        max_leverage: 50,
        only_isolated: false,
    }]);
    cache.put_asset_ctxs(Vec::new());

    let state = Arc::new(DaemonState::new(false, cache, Arc::new(AtomicBool::new(true))));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctx = Arc::new(ServerContext { state, shutdown_tx });
    let server = IpcServer::bind(&socket_path).await.unwrap();
    tokio::spawn(server.run(ctx, shutdown_rx));

    let info = Arc::new(NeverCalledInfo { calls: AtomicU32::new(0) });
    let orchestrator = FallbackOrchestrator::new(socket_path, info.clone());

    let perp_meta = orchestrator.get_perp_meta().await.unwrap();
    assert_eq!(perp_meta[0]["symbol"], "BTC");

    let asset_ctxs = orchestrator.get_asset_ctxs().await.unwrap();
    assert!(asset_ctxs.is_array());

    assert_eq!(info.calls.load(Ordering::SeqCst), 0, "daemon was healthy, upstream should never be touched");
}
