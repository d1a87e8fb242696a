//! Concrete HTTP info client: POSTs a `{type: <op>, ...params}` body to the
//! upstream's single info endpoint and decodes the JSON result, matching the
//! request shape the reconnecting push transport's companion HTTP API uses.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::PerpMarketMeta;
use crate::error::Result;
use crate::exchange::InfoClient;

pub struct HttpInfoClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInfoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.into() })
    }

    pub fn mainnet(timeout: Duration) -> Result<Self> {
        Self::new("https://api.hyperliquid.xyz/info", timeout)
    }

    pub fn testnet(timeout: Duration) -> Result<Self> {
        Self::new("https://api.hyperliquid-testnet.xyz/info", timeout)
    }

    async fn post(&self, body: Value) -> Result<Value> {
        let response = self.client.post(&self.base_url).json(&body).send().await?;
        let value = response.error_for_status()?.json::<Value>().await?;
        Ok(value)
    }
}

#[async_trait]
impl InfoClient for HttpInfoClient {
    async fn all_perp_metas(&self) -> Result<Vec<PerpMarketMeta>> {
        let value = self.post(serde_json::json!({ "type": "allPerpMetas" })).await?;
        let metas = value
            .get("metas")
            .cloned()
            .unwrap_or(value);
        Ok(serde_json::from_value(metas)?)
    }

    async fn meta(&self) -> Result<Value> {
        self.post(serde_json::json!({ "type": "meta" })).await
    }

    async fn meta_and_asset_ctxs(&self) -> Result<Value> {
        self.post(serde_json::json!({ "type": "metaAndAssetCtxs" })).await
    }

    async fn spot_meta(&self) -> Result<Value> {
        self.post(serde_json::json!({ "type": "spotMeta" })).await
    }

    async fn clearinghouse_state(&self, user: &str) -> Result<Value> {
        self.post(serde_json::json!({ "type": "clearinghouseState", "user": user })).await
    }

    async fn spot_clearinghouse_state(&self, user: &str) -> Result<Value> {
        self.post(serde_json::json!({ "type": "spotClearinghouseState", "user": user })).await
    }

    async fn open_orders(&self, user: &str) -> Result<Value> {
        self.post(serde_json::json!({ "type": "openOrders", "user": user })).await
    }

    async fn l2_book(&self, coin: &str) -> Result<Value> {
        self.post(serde_json::json!({ "type": "l2Book", "coin": coin })).await
    }

    async fn referral(&self, user: &str) -> Result<Value> {
        self.post(serde_json::json!({ "type": "referral", "user": user })).await
    }

    async fn user_role(&self, user: &str) -> Result<Value> {
        self.post(serde_json::json!({ "type": "userRole", "user": user })).await
    }

    async fn extra_agents(&self, user: &str) -> Result<Value> {
        self.post(serde_json::json!({ "type": "extraAgents", "user": user })).await
    }

    async fn active_asset_data(&self, user: &str, coin: &str) -> Result<Value> {
        self.post(serde_json::json!({ "type": "activeAssetData", "user": user, "coin": coin })).await
    }
}
