//! Balance / portfolio watcher: push subscription to clearinghouse state;
//! each event also triggers an HTTP pull of spot clearinghouse state, merged
//! into the emitted update. If the spot pull fails, the previous spot
//! snapshot is retained and the merged update is still delivered — a
//! transient spot-pull failure must not starve the perp side of updates.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::exchange::{Feed, FeedEvent, InfoClient, PushTransport};
use crate::watcher::{ErrorSink, UpdateSink, Watcher};

pub struct BalanceWatcher<I: InfoClient + 'static> {
    user: String,
    transport: Option<Box<dyn PushTransport>>,
    info: Arc<I>,
    on_update: UpdateSink,
    on_error: ErrorSink,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl<I: InfoClient + 'static> BalanceWatcher<I> {
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
}

#[async_trait::async_trait]
impl<I: InfoClient + 'static> Watcher for BalanceWatcher<I> {
    async fn start(&mut self) -> crate::error::Result<()> {
        let mut transport = self.transport.take().ok_or(Error::ConnectionClosed)?;
        transport.connect().await?;
        transport
            .subscribe(Feed::AllDexsClearinghouseState { user: self.user.clone() })
            .await?;

        let (tx, mut rx) = watch::channel(false);
        self.shutdown_tx = Some(tx);

        let user = self.user.clone();
        let info = self.info.clone();
        let on_update = self.on_update.clone();
        let on_error = self.on_error.clone();
        let last_spot: Arc<Mutex<Value>> = Arc::new(Mutex::new(Value::Null));

        self.task = Some(tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = rx.changed() => break,
                    event = transport.next_event() => event,
                };
                match event {
                    Some(FeedEvent::ClearinghouseState(perp)) => {
                        let spot = match info.spot_clearinghouse_state(&user).await {
                            Ok(value) => {
                                *last_spot.lock() = value.clone();
                                value
                            }
                            Err(e) => {
                                (on_error)(e);
                                last_spot.lock().clone()
                            }
                        };
                        (on_update)(serde_json::json!({ "perp": perp, "spot": spot }));
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
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use tokio::sync::Mutex as TokioMutex;

    struct ScriptedTransport {
        events: TokioMutex<VecDeque<Option<FeedEvent>>>,
    }

    #[async_trait]
    impl PushTransport for ScriptedTransport {
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
            self.events.lock().await.pop_front().flatten()
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn exchange_name(&self) -> &'static str {
            "fake"
        }
    }

    struct FlakySpotInfo {
        fail_next: AtomicBool,
        spot_calls: AtomicU32,
    }

    #[async_trait]
    impl InfoClient for FlakySpotInfo {
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
            self.spot_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                Err(Error::Other("spot pull failed".into()))
            } else {
                Ok(serde_json::json!({ "balance": "100" }))
            }
        }
        async fn open_orders(&self, _user: &str) -> crate::error::Result<Value> {
            Ok(Value::Null)
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
    async fn merges_perp_push_with_spot_pull() {
        use std::sync::Mutex as StdMutex;

        let transport = ScriptedTransport {
            events: TokioMutex::new(VecDeque::from(vec![Some(FeedEvent::ClearinghouseState(
                serde_json::json!({ "marginUsed": "10" }),
            ))])),
        };
        let info = Arc::new(FlakySpotInfo { fail_next: AtomicBool::new(false), spot_calls: AtomicU32::new(0) });
        let received: Arc<StdMutex<Vec<Value>>> = Arc::new(StdMutex::new(Vec::new()));
        let received_clone = received.clone();

        let mut watcher = BalanceWatcher::new(
            "0xabc",
            Box::new(transport),
            info,
            Arc::new(move |v| received_clone.lock().unwrap().push(v)),
            Arc::new(|_| {}),
        );
        watcher.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        watcher.stop().await;

        let got = received.lock().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0]["perp"]["marginUsed"], "10");
        assert_eq!(got[0]["spot"]["balance"], "100");
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let info = Arc::new(FlakySpotInfo { fail_next: AtomicBool::new(false), spot_calls: AtomicU32::new(0) });
        let mut watcher = BalanceWatcher::new(
            "0xabc",
            Box::new(ScriptedTransport { events: TokioMutex::new(VecDeque::new()) }),
            info,
            Arc::new(|_| {}),
            Arc::new(|_| {}),
        );
        watcher.stop().await;
    }
}
