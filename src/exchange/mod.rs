//! Upstream collaborator abstractions: a reconnecting push transport and an
//! HTTP info client. Concrete implementations live in [`ws`] and [`http`];
//! [`reconnecting`] wraps any [`PushTransport`] with backoff + circuit
//! breaking so callers never have to reconnect by hand.

pub mod http;
pub mod reconnecting;
pub mod wire;
pub mod ws;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::PerpMarketMeta;
use crate::error::Result;

pub use reconnecting::ReconnectingPushTransport;
pub use wire::{BookSnapshot, Feed, FeedEvent, SubscriptionHandle};

/// The upstream's auto-reconnecting push transport, referenced abstractly:
/// "a reconnecting push transport supporting at minimum subscriptions named
/// `allMids`, `allDexsAssetCtxs`, `l2Book`, `allDexsClearinghouseState`,
/// `orderUpdates`, and `activeAssetData`".
#[async_trait]
pub trait PushTransport: Send {
    async fn connect(&mut self) -> Result<()>;
    async fn subscribe(&mut self, feed: Feed) -> Result<SubscriptionHandle>;
    async fn unsubscribe(&mut self, handle: SubscriptionHandle) -> Result<()>;
    /// Blocks until the next event across every active subscription.
    async fn next_event(&mut self) -> Option<FeedEvent>;
    /// Whether the underlying socket is in the OPEN state.
    fn is_connected(&self) -> bool;
    fn exchange_name(&self) -> &'static str;
}

/// The upstream's HTTP info client, referenced abstractly: "supporting
/// `meta`, `allPerpMetas`, `metaAndAssetCtxs`, `spotMeta`,
/// `clearinghouseState`, `spotClearinghouseState`, `openOrders`, `l2Book`,
/// `referral`, `userRole`, `extraAgents`, `activeAssetData`".
#[async_trait]
pub trait InfoClient: Send + Sync {
    /// Perp market metadata. Feeds the `perpMetas` cache slot directly.
    async fn all_perp_metas(&self) -> Result<Vec<PerpMarketMeta>>;

    async fn meta(&self) -> Result<Value>;
    async fn meta_and_asset_ctxs(&self) -> Result<Value>;
    async fn spot_meta(&self) -> Result<Value>;
    async fn clearinghouse_state(&self, user: &str) -> Result<Value>;
    async fn spot_clearinghouse_state(&self, user: &str) -> Result<Value>;
    async fn open_orders(&self, user: &str) -> Result<Value>;
    async fn l2_book(&self, coin: &str) -> Result<Value>;
    async fn referral(&self, user: &str) -> Result<Value>;
    async fn user_role(&self, user: &str) -> Result<Value>;
    async fn extra_agents(&self, user: &str) -> Result<Value>;
    async fn active_asset_data(&self, user: &str, coin: &str) -> Result<Value>;
}
