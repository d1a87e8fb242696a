//! `watch <coin>`: streams live mid prices to the terminal, daemon-backed if
//! one is running, direct push otherwise. Thin glue between [`PriceWatcher`]
//! and the line-oriented output helpers in [`crate::cli::output`].

use std::sync::Arc;

use chrono::Utc;

use crate::cli::output;
use crate::error::Result;
use crate::exchange::ws::WsPushTransport;
use crate::paths;
use crate::watcher::{PriceWatcher, Watcher};

pub async fn execute(coin: String, testnet: bool, json: bool) -> Result<()> {
    let socket_path = paths::server_socket_path()?;
    let transport = if testnet { WsPushTransport::testnet() } else { WsPushTransport::mainnet() };

    let watch_coin = coin.clone();
    let on_update = Arc::new(move |value: serde_json::Value| {
        let timestamp = Utc::now().format("%H:%M:%S").to_string();
        if json {
            println!("{value}");
        } else if let Some(price) = value.get(&watch_coin) {
            output::update(&timestamp, &watch_coin, &price.to_string());
        }
    });
    let on_error = Arc::new(move |e: crate::error::Error| {
        let timestamp = Utc::now().format("%H:%M:%S").to_string();
        output::watch_error(&timestamp, &e.to_string());
    });

    let mut watcher = PriceWatcher::new(coin, socket_path, Box::new(transport), on_update, on_error);
    watcher.start().await?;

    tokio::signal::ctrl_c().await.ok();
    watcher.stop().await;
    Ok(())
}
