//! The daemon's process-wide shared state: `{started_at, testnet,
//! transport-connected, cache}`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::Cache;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

/// Created at daemon start, destroyed at shutdown. `connected` is a snapshot
/// published by the subscription manager's event loop, not polled live.
pub struct DaemonState {
    pub started_at: i64,
    pub testnet: bool,
    pub cache: Arc<Cache>,
    connected: Arc<AtomicBool>,
}

impl DaemonState {
    pub fn new(testnet: bool, cache: Arc<Cache>, connected: Arc<AtomicBool>) -> Self {
        Self { started_at: now_ms(), testnet, cache, connected }
    }

    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn uptime_ms(&self) -> i64 {
        (now_ms() - self.started_at).max(0)
    }
}
