//! A local mirror daemon for perpetual-futures market data: a background
//! process (`hl-server`) keeps a small cache of mids, asset contexts, and
//! perp metadata warm via a single upstream push subscription, and a
//! control-socket IPC protocol lets any number of local clients (including
//! the `hl` CLI) read that cache without each opening their own upstream
//! connection.

pub mod cache;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod exchange;
pub mod fallback;
pub mod ipc;
pub mod paths;
pub mod userconfig;
pub mod watcher;
