//! Thread-safe cache of the three named feeds the daemon mirrors.
//!
//! Each slot is an atomically-replaced `RwLock<Option<Entry<T>>>`: writers
//! swap in a whole new payload and timestamp, readers always see a complete
//! prior snapshot, and there is no fine-grained locking inside a slot's
//! payload. Once a slot has been written it is never nulled again.

pub mod types;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub use types::{AssetContext, Mids, PerpMarketMeta};

/// `(dex-name, ordered asset contexts for that dex)` pairs, in upstream order.
pub type AssetCtxsPayload = Vec<(String, Vec<AssetContext>)>;
pub type PerpMetasPayload = Vec<PerpMarketMeta>;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

#[derive(Debug, Clone)]
struct Entry<T> {
    payload: T,
    updated_at: i64,
}

/// A single named feed slot.
struct Slot<T> {
    entry: RwLock<Option<Entry<T>>>,
}

impl<T: Clone> Slot<T> {
    fn new() -> Self {
        Self { entry: RwLock::new(None) }
    }

    fn put(&self, payload: T) {
        let updated_at = now_ms();
        *self.entry.write() = Some(Entry { payload, updated_at });
    }

    fn get(&self) -> Option<(T, i64)> {
        self.entry
            .read()
            .as_ref()
            .map(|e| (e.payload.clone(), e.updated_at))
    }

    fn present(&self) -> bool {
        self.entry.read().is_some()
    }

    fn age_ms(&self) -> Option<i64> {
        self.entry.read().as_ref().map(|e| (now_ms() - e.updated_at).max(0))
    }
}

/// Per-slot presence/age, as returned by `getStatus`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotStatus {
    pub present: bool,
    #[serde(rename = "ageMs", skip_serializing_if = "Option::is_none")]
    pub age_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStatus {
    #[serde(rename = "hasMids")]
    pub has_mids: bool,
    #[serde(rename = "hasAssetCtxs")]
    pub has_asset_ctxs: bool,
    #[serde(rename = "hasPerpMetas")]
    pub has_perp_metas: bool,
    pub mids: SlotStatus,
    #[serde(rename = "assetCtxs")]
    pub asset_ctxs: SlotStatus,
    #[serde(rename = "perpMetas")]
    pub perp_metas: SlotStatus,
}

/// The daemon's three fixed named feed slots.
pub struct Cache {
    mids: Slot<Mids>,
    asset_ctxs: Slot<AssetCtxsPayload>,
    perp_metas: Slot<PerpMetasPayload>,
}

impl Cache {
    pub fn new() -> Self {
        Self {
            mids: Slot::new(),
            asset_ctxs: Slot::new(),
            perp_metas: Slot::new(),
        }
    }

    pub fn put_mids(&self, payload: Mids) {
        self.mids.put(payload);
    }

    pub fn get_mids(&self) -> Option<(Mids, i64)> {
        self.mids.get()
    }

    pub fn put_asset_ctxs(&self, payload: AssetCtxsPayload) {
        self.asset_ctxs.put(payload);
    }

    pub fn get_asset_ctxs(&self) -> Option<(AssetCtxsPayload, i64)> {
        self.asset_ctxs.get()
    }

    pub fn put_perp_metas(&self, payload: PerpMetasPayload) {
        self.perp_metas.put(payload);
    }

    pub fn get_perp_metas(&self) -> Option<(PerpMetasPayload, i64)> {
        self.perp_metas.get()
    }

    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            has_mids: self.mids.present(),
            has_asset_ctxs: self.asset_ctxs.present(),
            has_perp_metas: self.perp_metas.present(),
            mids: SlotStatus { present: self.mids.present(), age_ms: self.mids.age_ms() },
            asset_ctxs: SlotStatus {
                present: self.asset_ctxs.present(),
                age_ms: self.asset_ctxs.age_ms(),
            },
            perp_metas: SlotStatus {
                present: self.perp_metas.present(),
                age_ms: self.perp_metas.age_ms(),
            },
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = Cache::new();
        let mut mids = HashMap::new();
        mids.insert("BTC".to_string(), "50000".to_string());
        cache.put_mids(mids.clone());

        let (got, _updated_at) = cache.get_mids().unwrap();
        assert_eq!(got, mids);
    }

    #[test]
    fn empty_slot_is_absent() {
        let cache = Cache::new();
        assert!(cache.get_mids().is_none());
        let status = cache.status();
        assert!(!status.has_mids);
        assert!(status.mids.age_ms.is_none());
    }

    #[test]
    fn status_reflects_only_populated_slots() {
        let cache = Cache::new();
        cache.put_mids(HashMap::new());
        let status = cache.status();
        assert!(status.has_mids);
        assert!(!status.has_asset_ctxs);
        assert!(!status.has_perp_metas);
    }

    #[test]
    fn put_updates_timestamp_forward() {
        let cache = Cache::new();
        cache.put_mids(HashMap::new());
        let (_, first) = cache.get_mids().unwrap();
        cache.put_mids(HashMap::new());
        let (_, second) = cache.get_mids().unwrap();
        assert!(second >= first);
    }

    #[test]
    fn a_slot_never_goes_back_to_absent() {
        let cache = Cache::new();
        cache.put_perp_metas(Vec::new());
        assert!(cache.get_perp_metas().is_some());
        cache.put_perp_metas(Vec::new());
        assert!(cache.get_perp_metas().is_some());
    }
}
