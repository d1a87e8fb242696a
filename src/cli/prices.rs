//! `prices [COIN]`: a cache-backed read that demonstrates C6 end to end —
//! tries the daemon over its control socket, falls back to exactly one
//! direct upstream HTTP call if the daemon is absent or misbehaving. Not a
//! trading command; just the thinnest possible caller for the fallback
//! orchestrator, same role `watch` plays for the watcher pattern.

use std::sync::Arc;
use std::time::Duration;

use tabled::{Table, Tabled};

use crate::cli::output;
use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::exchange::http::HttpInfoClient;
use crate::fallback::FallbackOrchestrator;
use crate::paths;

#[derive(Tabled)]
struct PriceRow {
    #[tabled(rename = "Coin")]
    coin: String,
    #[tabled(rename = "Mid Price")]
    price: String,
}

pub async fn execute(coin: Option<String>, testnet: bool, json: bool) -> Result<()> {
    let socket_path = paths::server_socket_path()?;

    let runtime_config = RuntimeConfig::load(&paths::runtime_config_path()?).unwrap_or_default();
    let http_timeout = Duration::from_millis(runtime_config.http_timeout_ms);
    let info = if testnet { HttpInfoClient::testnet(http_timeout)? } else { HttpInfoClient::mainnet(http_timeout)? };

    let orchestrator = FallbackOrchestrator::new(socket_path, Arc::new(info));
    let coin = coin.map(|c| c.to_uppercase());
    let value = orchestrator.get_prices(coin.as_deref()).await?;

    if json {
        println!("{value}");
        return Ok(());
    }

    // Daemon-backed reads return a flat coin->price map (optionally
    // filtered to the requested coin); the upstream fallback has no direct
    // "all mids" call and returns the broader combined meta+contexts blob
    // instead (see `FallbackOrchestrator::get_prices`), so only the flat
    // shape gets tabular rendering.
    output::section("Prices");
    match value.as_object() {
        Some(map) if !map.is_empty() && map.values().all(|v| v.is_string()) => {
            let mut rows: Vec<PriceRow> = map
                .iter()
                .map(|(coin, price)| PriceRow {
                    coin: coin.clone(),
                    price: price.as_str().unwrap_or_default().to_string(),
                })
                .collect();
            rows.sort_by(|a, b| a.coin.cmp(&b.coin));

            let table = Table::new(rows).to_string();
            for line in table.lines() {
                println!("  {line}");
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())),
    }
    Ok(())
}
