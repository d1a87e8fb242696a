//! Position watcher: a direct push subscription to "all-dexes clearinghouse
//! state" for an address. Forwards every raw state event unmodified — the
//! renderer, not this crate, interprets the shape.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::exchange::{Feed, FeedEvent, PushTransport};
use crate::watcher::{ErrorSink, UpdateSink, Watcher};

pub struct PositionWatcher {
    user: String,
    transport: Option<Box<dyn PushTransport>>,
    on_update: UpdateSink,
    on_error: ErrorSink,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PositionWatcher {
    pub fn new(
        user: impl Into<String>,
        transport: Box<dyn PushTransport>,
        on_update: UpdateSink,
        on_error: ErrorSink,
    ) -> Self {
        Self {
            user: user.into(),
            transport: Some(transport),
            on_update,
            on_error,
            shutdown_tx: None,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl Watcher for PositionWatcher {
    async fn start(&mut self) -> crate::error::Result<()> {
        let mut transport = self.transport.take().ok_or(crate::error::Error::ConnectionClosed)?;
        transport.connect().await?;
        transport
            .subscribe(Feed::AllDexsClearinghouseState { user: self.user.clone() })
            .await?;

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
                    Some(FeedEvent::ClearinghouseState(value)) => (on_update)(value),
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
