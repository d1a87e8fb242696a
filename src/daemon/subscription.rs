//! Subscription manager (C2): owns the upstream push connection, routes
//! inbound events into the cache, and schedules periodic HTTP refresh of the
//! slow-moving perp-metadata feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::Cache;
use crate::exchange::{Feed, FeedEvent, InfoClient, PushTransport, SubscriptionHandle};

const CONNECTED_FLAG_POLL: Duration = Duration::from_millis(500);

/// Owns the reconnecting push transport and the periodic HTTP refresh timer.
///
/// `T` is almost always `ReconnectingPushTransport<WsPushTransport>`; kept
/// generic so tests can swap in fakes.
pub struct SubscriptionManager<T: PushTransport + 'static, I: InfoClient + 'static> {
    transport: Arc<Mutex<T>>,
    info: Arc<I>,
    cache: Arc<Cache>,
    handles: Vec<SubscriptionHandle>,
    /// How often `refresh_loop` re-fetches perp metadata; sourced from
    /// `RuntimeConfig::perp_meta_refresh_ms`.
    refresh_interval: Duration,
    shutdown_tx: Option<watch::Sender<bool>>,
    event_loop: Option<JoinHandle<()>>,
    refresh_loop: Option<JoinHandle<()>>,
    /// Refreshed roughly every 500ms by the event loop so `getStatus` can
    /// read it without taking the transport lock.
    connected_flag: Arc<AtomicBool>,
}

impl<T: PushTransport + 'static, I: InfoClient + 'static> SubscriptionManager<T, I> {
    pub fn new(transport: T, info: Arc<I>, cache: Arc<Cache>, refresh_interval: Duration) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            info,
            cache,
            handles: Vec::new(),
            refresh_interval,
            shutdown_tx: None,
            event_loop: None,
            refresh_loop: None,
            connected_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A cheap, lock-free snapshot of transport health for `getStatus`.
    pub fn connected_handle(&self) -> Arc<AtomicBool> {
        self.connected_flag.clone()
    }

    /// Opens the transport, subscribes to the two push feeds, performs the
    /// initial perp-metadata fetch, and spawns the background tasks. Returns
    /// once the transport reports ready and the initial fetch completes.
    pub async fn start(&mut self) -> crate::error::Result<()> {
        {
            let mut transport = self.transport.lock().await;
            transport.connect().await?;
            self.handles.push(transport.subscribe(Feed::AllMids).await?);
            self.handles.push(transport.subscribe(Feed::AllDexsAssetCtxs).await?);
        }

        match self.info.all_perp_metas().await {
            Ok(metas) => self.cache.put_perp_metas(metas),
            Err(e) => warn!(error = %e, "initial perp-meta fetch failed, will retry on next tick"),
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        self.connected_flag.store(true, Ordering::Relaxed);
        self.event_loop = Some(tokio::spawn(event_loop(
            self.transport.clone(),
            self.cache.clone(),
            self.connected_flag.clone(),
            shutdown_rx.clone(),
        )));
        self.refresh_loop = Some(tokio::spawn(refresh_loop(
            self.info.clone(),
            self.cache.clone(),
            self.refresh_interval,
            shutdown_rx,
        )));

        Ok(())
    }

    /// Whether the push transport's underlying socket is in the OPEN state.
    /// Takes the transport lock directly; prefer `connected_handle()` from
    /// hot paths like IPC request handling.
    pub async fn connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Cancels the refresh timer, unsubscribes every handle (swallowing
    /// errors), and stops the event loop. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.refresh_loop.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.event_loop.take() {
            let _ = handle.await;
        }

        let mut transport = self.transport.lock().await;
        for handle in self.handles.drain(..).rev() {
            if let Err(e) = transport.unsubscribe(handle).await {
                warn!(error = %e, "unsubscribe failed during shutdown, continuing");
            }
        }
    }
}

async fn event_loop<T: PushTransport>(
    transport: Arc<Mutex<T>>,
    cache: Arc<Cache>,
    connected_flag: Arc<AtomicBool>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut flag_poll = tokio::time::interval(CONNECTED_FLAG_POLL);
    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => break,
            _ = flag_poll.tick() => {
                // A non-blocking peek: if the lock is free the transport is
                // between events (not mid-reconnect), so its state is current.
                if let Ok(transport) = transport.try_lock() {
                    connected_flag.store(transport.is_connected(), Ordering::Relaxed);
                }
                continue;
            },
            event = async {
                let mut transport = transport.lock().await;
                transport.next_event().await
            } => event,
        };

        match event {
            Some(FeedEvent::Mids(mids)) => {
                connected_flag.store(true, Ordering::Relaxed);
                cache.put_mids(mids);
            }
            Some(FeedEvent::AssetCtxs(ctxs)) => {
                connected_flag.store(true, Ordering::Relaxed);
                cache.put_asset_ctxs(ctxs);
            }
            // Any other feed only matters to watchers, which hold their own
            // direct subscriptions; C2 only ever asked for mids + asset ctxs.
            Some(_) => {}
            None => {
                debug!("subscription manager event stream ended");
                break;
            }
        }

        if *shutdown.borrow() {
            break;
        }
    }
}

async fn refresh_loop<I: InfoClient>(
    info: Arc<I>,
    cache: Arc<Cache>,
    refresh_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(refresh_interval);
    ticker.tick().await; // first tick fires immediately; we already did the initial fetch in start()
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                match info.all_perp_metas().await {
                    Ok(metas) => {
                        cache.put_perp_metas(metas);
                        debug!("refreshed perp metadata");
                    }
                    Err(e) => error!(error = %e, "periodic perp-meta refresh failed"),
                }
            }
        }
        if *shutdown.borrow() {
            break;
        }
    }
    info!("perp-meta refresh loop stopped");
}
