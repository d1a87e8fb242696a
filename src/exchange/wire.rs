//! Logical shapes of the upstream collaborators' operations.
//!
//! The core never specifies the wire encoding of these calls — only the
//! operation names and the shapes that flow into the cache. Anything that
//! doesn't feed a cache slot (order books for a single symbol, clearinghouse
//! state, order updates, active asset data) is carried as an untyped
//! [`serde_json::Value`] since its shape is a concern of the renderer, not
//! the core.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{AssetCtxsPayload, Mids, PerpMarketMeta};

/// A logical push subscription the transport can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    AllMids,
    AllDexsAssetCtxs,
    L2Book { coin: String },
    AllDexsClearinghouseState { user: String },
    OrderUpdates { user: String },
    ActiveAssetData { user: String, coin: String },
}

impl Feed {
    pub fn name(&self) -> &'static str {
        match self {
            Feed::AllMids => "allMids",
            Feed::AllDexsAssetCtxs => "allDexsAssetCtxs",
            Feed::L2Book { .. } => "l2Book",
            Feed::AllDexsClearinghouseState { .. } => "allDexsClearinghouseState",
            Feed::OrderUpdates { .. } => "orderUpdates",
            Feed::ActiveAssetData { .. } => "activeAssetData",
        }
    }
}

/// An opaque cancellation token returned when a subscription is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Normalized L2 book snapshot, the book watcher's forwarded shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookLevel {
    pub px: String,
    pub sz: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookSnapshot {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub time: i64,
}

/// Events delivered by a [`crate::exchange::PushTransport`].
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Mids(Mids),
    AssetCtxs(AssetCtxsPayload),
    Book(BookSnapshot),
    ClearinghouseState(Value),
    OrderUpdates(Value),
    ActiveAssetData(Value),
    /// The transport's socket dropped. The reconnecting wrapper swallows
    /// this and reconnects instead of ever returning it to a caller.
    Disconnected { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerpMetasResponse {
    pub metas: Vec<PerpMarketMeta>,
}
