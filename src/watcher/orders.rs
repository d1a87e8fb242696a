//! Orders watcher: push is a change-trigger only. Every "order updates"
//! event (and once, eagerly, at start) triggers an HTTP pull of the full
//! current "open orders" list, which is what actually gets forwarded.
//!
//! The push feed announces deltas but not a deterministic snapshot, so the
//! HTTP pull is treated as authoritative and unconditional — we do not
//! attempt to merge fields from the delta into it. Two rapid pushes may
//! therefore coalesce into a single emitted snapshot if the second HTTP
//! call preempts the first's delivery. Pull errors are surfaced via
//! `on_error` and never tear down the subscription.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::exchange::{Feed, FeedEvent, InfoClient, PushTransport};
use crate::watcher::{ErrorSink, UpdateSink, Watcher};

pub struct OrdersWatcher<I: InfoClient + 'static> {
    user: String,
    transport: Option<Box<dyn PushTransport>>,
    info: Arc<I>,
    on_update: UpdateSink,
    on_error: ErrorSink,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl<I: InfoClient + 'static> OrdersWatcher<I> {
    pub fn new(
        user: impl Into<String>,
        transport: Box<dyn PushTransport>,
        info: Arc<I>,
        on_update: UpdateSink,
        on_error: ErrorSink,
    ) -> Self {
        Self {
            user: user.into(),
            transport: Some(transport),
            info,
            on_update,
            on_error,
            shutdown_tx: None,
            task: None,
        }
    }

    async fn pull_and_forward(info: &I, user: &str, on_update: &UpdateSink, on_error: &ErrorSink) {
        match info.open_orders(user).await {
            Ok(value) => (on_update)(value),
            Err(e) => (on_error)(e),
        }
    }
}

#[async_trait::async_trait]
impl<I: InfoClient + 'static> Watcher for OrdersWatcher<I> {
    async fn start(&mut self) -> crate::error::Result<()> {
        let mut transport = self.transport.take().ok_or(Error::ConnectionClosed)?;
        transport.connect().await?;
        transport.subscribe(Feed::OrderUpdates { user: self.user.clone() }).await?;

        let (tx, mut rx) = watch::channel(false);
        self.shutdown_tx = Some(tx);

        // One eager pull for the initial snapshot, before the first push
        // arrives.
        Self::pull_and_forward(&self.info, &self.user, &self.on_update, &self.on_error).await;

        let user = self.user.clone();
        let info = self.info.clone();
        let on_update = self.on_update.clone();
        let on_error = self.on_error.clone();
        self.task = Some(tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = rx.changed() => break,
                    event = transport.next_event() => event,
                };
                match event {
                    Some(FeedEvent::OrderUpdates(_)) => {
                        Self::pull_and_forward(&info, &user, &on_update, &on_error).await;
                    }
                    Some(_) => {}
                    None => {
                        (on_error)(Error::ConnectionClosed);
                        break;
                    }
                }
                if *rx.borrow() {
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::SubscriptionHandle;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct NeverConnects;

    #[async_trait]
    impl PushTransport for NeverConnects {
        async fn connect(&mut self) -> crate::error::Result<()> {
            Ok(())
        }
        async fn subscribe(&mut self, _feed: Feed) -> crate::error::Result<SubscriptionHandle> {
            Ok(SubscriptionHandle(1))
        }
        async fn unsubscribe(&mut self, _handle: SubscriptionHandle) -> crate::error::Result<()> {
            Ok(())
        }
        async fn next_event(&mut self) -> Option<FeedEvent> {
            std::future::pending().await
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn exchange_name(&self) -> &'static str {
            "fake"
        }
    }

    struct CountingInfo {
        calls: AtomicU32,
    }

    #[async_trait]
    impl InfoClient for CountingInfo {
        async fn all_perp_metas(&self) -> crate::error::Result<Vec<crate::cache::PerpMarketMeta>> {
            Ok(Vec::new())
        }
        async fn meta(&self) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
        async fn meta_and_asset_ctxs(&self) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
        async fn spot_meta(&self) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
        async fn clearinghouse_state(&self, _user: &str) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
        async fn spot_clearinghouse_state(&self, _user: &str) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
        async fn open_orders(&self, _user: &str) -> crate::error::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!([]))
        }
        async fn l2_book(&self, _coin: &str) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
        async fn referral(&self, _user: &str) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
        async fn user_role(&self, _user: &str) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
        async fn extra_agents(&self, _user: &str) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
        async fn active_asset_data(&self, _user: &str, _coin: &str) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn start_pulls_once_eagerly_for_the_initial_snapshot() {
        let info = Arc::new(CountingInfo { calls: AtomicU32::new(0) });
        let mut watcher = OrdersWatcher::new(
            "0xabc",
            Box::new(NeverConnects),
            info.clone(),
            Arc::new(|_| {}),
            Arc::new(|_| {}),
        );
        watcher.start().await.unwrap();
        assert_eq!(info.calls.load(Ordering::SeqCst), 1);
        watcher.stop().await;
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let info = Arc::new(CountingInfo { calls: AtomicU32::new(0) });
        let mut watcher = OrdersWatcher::new(
            "0xabc",
            Box::new(NeverConnects),
            info,
            Arc::new(|_| {}),
            Arc::new(|_| {}),
        );
        watcher.stop().await;
    }
}
