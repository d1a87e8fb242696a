//! Watcher pattern (C7): a start/stop object fusing a push subscription with
//! optional HTTP pulls, emitting normalized update events. Used by live
//! terminal views; this crate's own caller is the `watch` CLI subcommand.

pub mod balance;
pub mod book;
pub mod orders;
pub mod position;
pub mod price;

use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;

/// Invoked from the transport's delivery context; must not block
/// indefinitely.
pub type UpdateSink = Arc<dyn Fn(Value) + Send + Sync>;
pub type ErrorSink = Arc<dyn Fn(Error) + Send + Sync>;

/// `new -> started -> stopped`. `stop` is idempotent and must never raise;
/// `start` after `stop` is not supported.
#[async_trait::async_trait]
pub trait Watcher: Send {
    async fn start(&mut self) -> crate::error::Result<()>;
    async fn stop(&mut self);
}

pub use balance::BalanceWatcher;
pub use book::BookWatcher;
pub use orders::OrdersWatcher;
pub use position::PositionWatcher;
pub use price::PriceWatcher;

/// The portfolio watcher is the same perp-push/spot-pull merge as
/// [`BalanceWatcher`]; the source distinguishes them only by which terminal
/// view consumes the merged update, not by behavior.
pub type PortfolioWatcher<I> = BalanceWatcher<I>;
