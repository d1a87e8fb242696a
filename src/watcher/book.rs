//! Book watcher: always a direct push subscription to the L2 order book for
//! a single symbol. Unlike the price watcher there is no daemon-polling
//! mode — the daemon's cache doesn't carry per-symbol books.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::exchange::{Feed, FeedEvent, PushTransport};
use crate::watcher::{ErrorSink, UpdateSink, Watcher};

pub struct BookWatcher {
    coin: String,
    transport: Option<Box<dyn PushTransport>>,
    on_update: UpdateSink,
    on_error: ErrorSink,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl BookWatcher {
    pub fn new(
        coin: impl Into<String>,
        transport: Box<dyn PushTransport>,
        on_update: UpdateSink,
        on_error: ErrorSink,
    ) -> Self {
        Self {
            coin: coin.into(),
            transport: Some(transport),
            on_update,
            on_error,
            shutdown_tx: None,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl Watcher for BookWatcher {
    async fn start(&mut self) -> crate::error::Result<()> {
        let mut transport = self.transport.take().ok_or(crate::error::Error::ConnectionClosed)?;
        transport.connect().await?;
        transport.subscribe(Feed::L2Book { coin: self.coin.clone() }).await?;

        let (tx, mut rx) = watch::channel(false);
        self.shutdown_tx = Some(tx);

        let on_update = self.on_update.clone();
        let on_error = self.on_error.clone();
        self.task = Some(tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = rx.changed() => break,
                    event = transport.next_event() => event,
                };
                match event {
                    Some(FeedEvent::Book(snapshot)) => {
                        (on_update)(serde_json::to_value(&snapshot).unwrap_or(serde_json::Value::Null));
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
