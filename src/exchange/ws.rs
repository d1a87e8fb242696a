//! Concrete push transport: a single WebSocket connection to the upstream
//! exchange, subscribed to zero or more [`Feed`]s at a time.
//!
//! This does not reconnect on its own — wrap it in
//! [`crate::exchange::ReconnectingPushTransport`] for that. Ping/pong is
//! answered transparently; any text frame that doesn't parse as a recognized
//! channel message is logged and skipped rather than tearing down the
//! connection.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::cache::types::AssetContext;
use crate::error::{Error, Result};
use crate::exchange::wire::{BookLevel, BookSnapshot};
use crate::exchange::{Feed, FeedEvent, PushTransport, SubscriptionHandle};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Serialize)]
struct SubscribeMessage<'a> {
    method: &'a str,
    subscription: Value,
}

fn subscription_payload(feed: &Feed) -> Value {
    match feed {
        Feed::AllMids => serde_json::json!({ "type": "allMids" }),
        Feed::AllDexsAssetCtxs => serde_json::json!({ "type": "allDexsAssetCtxs" }),
        Feed::L2Book { coin } => serde_json::json!({ "type": "l2Book", "coin": coin }),
        Feed::AllDexsClearinghouseState { user } => {
            serde_json::json!({ "type": "allDexsClearinghouseState", "user": user })
        }
        Feed::OrderUpdates { user } => serde_json::json!({ "type": "orderUpdates", "user": user }),
        Feed::ActiveAssetData { user, coin } => {
            serde_json::json!({ "type": "activeAssetData", "user": user, "coin": coin })
        }
    }
}

/// A single WebSocket connection carrying every currently-subscribed feed.
pub struct WsPushTransport {
    url: String,
    socket: Option<Socket>,
    next_handle: u64,
}

impl WsPushTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), socket: None, next_handle: 1 }
    }

    pub fn mainnet() -> Self {
        Self::new("wss://api.hyperliquid.xyz/ws")
    }

    pub fn testnet() -> Self {
        Self::new("wss://api.hyperliquid-testnet.xyz/ws")
    }

    fn parse_event(channel: &str, data: &Value) -> Option<FeedEvent> {
        match channel {
            "allMids" => {
                let mids = data.get("mids")?.as_object()?;
                let mids = mids
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect();
                Some(FeedEvent::Mids(mids))
            }
            "allDexsAssetCtxs" => {
                let arr = data.as_array()?;
                let mut out = Vec::with_capacity(arr.len());
                for entry in arr {
                    let dex = entry.get(0)?.as_str()?.to_string();
                    let ctxs: Vec<AssetContext> =
                        serde_json::from_value(entry.get(1)?.clone()).ok()?;
                    out.push((dex, ctxs));
                }
                Some(FeedEvent::AssetCtxs(out))
            }
            "l2Book" => {
                let levels = data.get("levels")?.as_array()?;
                let parse_side = |side: &Value| -> Vec<BookLevel> {
                    side.as_array()
                        .map(|levels| {
                            levels
                                .iter()
                                .filter_map(|l| {
                                    Some(BookLevel {
                                        px: l.get("px")?.as_str()?.to_string(),
                                        sz: l.get("sz")?.as_str()?.to_string(),
                                    })
                                })
                                .collect()
                        })
                        .unwrap_or_default()
                };
                let bids = levels.first().map(parse_side).unwrap_or_default();
                let asks = levels.get(1).map(parse_side).unwrap_or_default();
                let time = data.get("time").and_then(Value::as_i64).unwrap_or(0);
                Some(FeedEvent::Book(BookSnapshot { bids, asks, time }))
            }
            "allDexsClearinghouseState" => Some(FeedEvent::ClearinghouseState(data.clone())),
            "orderUpdates" => Some(FeedEvent::OrderUpdates(data.clone())),
            "activeAssetData" => Some(FeedEvent::ActiveAssetData(data.clone())),
            other => {
                debug!(channel = other, "ignoring unrecognized push channel");
                None
            }
        }
    }
}

#[async_trait]
impl PushTransport for WsPushTransport {
    async fn connect(&mut self) -> Result<()> {
        let (socket, _response) = connect_async(&self.url).await?;
        self.socket = Some(socket);
        Ok(())
    }

    async fn subscribe(&mut self, feed: Feed) -> Result<SubscriptionHandle> {
        let socket = self.socket.as_mut().ok_or(Error::ConnectionClosed)?;
        let message = SubscribeMessage { method: "subscribe", subscription: subscription_payload(&feed) };
        socket.send(Message::Text(serde_json::to_string(&message)?)).await?;
        let handle = SubscriptionHandle(self.next_handle);
        self.next_handle += 1;
        Ok(handle)
    }

    async fn unsubscribe(&mut self, _handle: SubscriptionHandle) -> Result<()> {
        // Best-effort: the upstream protocol doesn't expose handle-addressed
        // unsubscribe on this path; closing the socket at shutdown releases
        // every subscription at once.
        Ok(())
    }

    async fn next_event(&mut self) -> Option<FeedEvent> {
        let socket = self.socket.as_mut()?;
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    let parsed: Value = match serde_json::from_str(&text) {
                        Ok(v) => v,
                        Err(e) => {
                            warn!(error = %e, "dropping malformed push message");
                            continue;
                        }
                    };
                    let channel = parsed.get("channel").and_then(Value::as_str);
                    let data = parsed.get("data");
                    match (channel, data) {
                        (Some(channel), Some(data)) => {
                            if let Some(event) = Self::parse_event(channel, data) {
                                return Some(event);
                            }
                            continue;
                        }
                        _ => continue,
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = socket.send(Message::Pong(payload)).await;
                    continue;
                }
                Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    return Some(FeedEvent::Disconnected { reason: "socket closed".into() });
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Some(FeedEvent::Disconnected { reason: e.to_string() });
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn exchange_name(&self) -> &'static str {
        "hyperliquid"
    }
}
