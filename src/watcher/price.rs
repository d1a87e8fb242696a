//! Price watcher: polls the daemon if it's running, otherwise opens a direct
//! push subscription to "all mids". Exactly one mode is active at a time;
//! switching modes requires a fresh watcher (stop, then start a new one).

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::exchange::{Feed, FeedEvent, PushTransport};
use crate::ipc::client::{server_running, IpcClient};
use crate::watcher::{ErrorSink, UpdateSink, Watcher};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct PriceWatcher {
    coin: String,
    socket_path: PathBuf,
    transport: Option<Box<dyn PushTransport>>,
    on_update: UpdateSink,
    on_error: ErrorSink,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PriceWatcher {
    pub fn new(
        coin: impl Into<String>,
        socket_path: PathBuf,
        transport: Box<dyn PushTransport>,
        on_update: UpdateSink,
        on_error: ErrorSink,
    ) -> Self {
        Self {
            coin: coin.into(),
            socket_path,
            transport: Some(transport),
            on_update,
            on_error,
            shutdown_tx: None,
            task: None,
        }
    }
}

#[async_trait]
impl Watcher for PriceWatcher {
    async fn start(&mut self) -> crate::error::Result<()> {
        let (tx, mut rx) = watch::channel(false);
        self.shutdown_tx = Some(tx);

        if server_running(&self.socket_path) {
            if let Some(client) = IpcClient::try_connect(&self.socket_path).await {
                let coin = self.coin.clone();
                let on_update = self.on_update.clone();
                let on_error = self.on_error.clone();
                self.task = Some(tokio::spawn(async move {
                    let mut interval = tokio::time::interval(POLL_INTERVAL);
                    loop {
                        tokio::select! {
                            _ = rx.changed() => break,
                            _ = interval.tick() => {
                                match client.get_prices(Some(&coin)).await {
                                    Ok(value) => (on_update)(value),
                                    Err(e) => (on_error)(e),
                                }
                            }
                        }
                        if *rx.borrow() {
                            break;
                        }
                    }
                }));
                return Ok(());
            }
            debug!("daemon socket present but refused connection, falling back to direct push");
        }

        let mut transport = self.transport.take().ok_or(crate::error::Error::ConnectionClosed)?;
        transport.connect().await?;
        transport.subscribe(Feed::AllMids).await?;

        let coin = self.coin.clone();
        let on_update = self.on_update.clone();
        let on_error = self.on_error.clone();
        self.task = Some(tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = rx.changed() => break,
                    event = transport.next_event() => event,
                };
                match event {
                    Some(FeedEvent::Mids(mids)) => {
                        if let Some(price) = mids.get(&coin) {
                            (on_update)(serde_json::json!({ coin.clone(): price }));
                        }
                    }
                    Some(_) => {}
                    None => {
                        (on_error)(crate::error::Error::ConnectionClosed);
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
    use std::sync::atomic::{AtomicBool, Ordering};
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

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let mut watcher = PriceWatcher::new(
            "BTC",
            PathBuf::from("/nonexistent/server.sock"),
            Box::new(NeverConnects),
            Arc::new(|_| {}),
            Arc::new(|_| {}),
        );
        watcher.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent_after_start() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();
        let mut watcher = PriceWatcher::new(
            "BTC",
            PathBuf::from("/nonexistent/server.sock"),
            Box::new(NeverConnects),
            Arc::new(move |_| called_clone.store(true, Ordering::SeqCst)),
            Arc::new(|_| {}),
        );
        watcher.start().await.unwrap();
        watcher.stop().await;
        watcher.stop().await;
    }
}
