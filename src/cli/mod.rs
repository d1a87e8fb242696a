//! The CLI surface that exercises the core from the command line:
//! `server start|stop|status`, `config set|get|list`, and a thin `watch`
//! demonstration subcommand. Argument parsing itself is out of the core's
//! scope per the source spec; this module is the ambient plumbing needed to
//! actually drive C4/C5/C6/C7 from a terminal.

pub mod config;
pub mod output;
pub mod prices;
pub mod server;
pub mod watch;

use clap::{Parser, Subcommand};

/// Local CLI for the perp-market mirror daemon.
#[derive(Parser, Debug)]
#[command(name = "hl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit machine-readable JSON instead of formatted text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the background daemon.
    #[command(subcommand)]
    Server(ServerCommands),

    /// Read or write the per-user config (currently just `slippage`).
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Stream live mid prices for a symbol (daemon-backed if running, else
    /// a direct push subscription).
    Watch(WatchArgs),

    /// Read current mid price(s), daemon-backed if running, else a single
    /// direct upstream call (see [`crate::fallback::FallbackOrchestrator`]).
    Prices(PricesArgs),
}

#[derive(Subcommand, Debug)]
pub enum ServerCommands {
    /// Start the daemon, detached from this terminal.
    Start {
        /// Target testnet instead of mainnet.
        #[arg(long, default_value_t = false)]
        testnet: bool,
    },
    /// Stop the running daemon.
    Stop,
    /// Report the daemon's connection state and cache freshness.
    Status,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set a config key.
    Set { key: String, value: String },
    /// Get a config key.
    Get { key: String },
    /// List every config key and its current value.
    List,
}

#[derive(clap::Args, Debug)]
pub struct WatchArgs {
    /// Asset symbol, e.g. `BTC`.
    pub coin: String,

    /// Target testnet instead of mainnet when a direct push subscription is
    /// needed (the daemon's own `--testnet` setting governs the daemon-backed
    /// path).
    #[arg(long, default_value_t = false)]
    pub testnet: bool,
}

#[derive(clap::Args, Debug)]
pub struct PricesArgs {
    /// Asset symbol, e.g. `BTC`. Omit to read every cached mid price.
    pub coin: Option<String>,

    /// Target testnet instead of mainnet when the direct upstream fallback
    /// is needed (the daemon's own `--testnet` setting governs the
    /// daemon-backed path).
    #[arg(long, default_value_t = false)]
    pub testnet: bool,
}
