//! Periodic blocklist reload.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::BlocklistConfig;
use crate::refresh::interval::resolve_interval;
use crate::security::BlocklistCache;
use crate::store::GatewayStore;

/// Handle to a started scheduler.
pub struct ScheduledRefresh {
    /// Period fixed at startup.
    pub interval: Duration,
    /// The timer loop; ends when shutdown is signalled.
    pub task: JoinHandle<()>,
}

/// Drives blocklist reloads from the store.
pub struct RefreshScheduler {
    store: Arc<dyn GatewayStore>,
    blocklist: Arc<BlocklistCache>,
    interval_key: String,
    default_interval: Duration,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        blocklist: Arc<BlocklistCache>,
        config: &BlocklistConfig,
    ) -> Self {
        Self {
            store,
            blocklist,
            interval_key: config.interval_key.clone(),
            default_interval: Duration::from_secs(config.default_interval_secs),
        }
    }

    /// Resolve the interval, load the blocklist once, then start the timer.
    ///
    /// The interval is read only here; later changes to the stored value
    /// take effect on the next process start.
    pub async fn start(self, shutdown: broadcast::Receiver<()>) -> ScheduledRefresh {
        let interval =
            resolve_interval(self.store.as_ref(), &self.interval_key, self.default_interval).await;

        // Failure is already logged; the gateway starts with an empty list
        let _ = self.blocklist.refresh(self.store.as_ref()).await;

        tracing::info!(interval_secs = interval.as_secs(), "Blocklist refresh scheduled");

        let task = tokio::spawn(self.run(interval, shutdown));
        ScheduledRefresh { interval, task }
    }

    async fn run(self, period: Duration, mut shutdown: broadcast::Receiver<()>) {
        let now = Instant::now();
        let first_tick = now.checked_add(period).unwrap_or(now);
        let mut ticker = time::interval_at(first_tick, period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.spawn_refresh();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Refresh scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Each tick runs on its own task, so a slow query never delays the
    /// timer. Overlapping refreshes are allowed; the last publish wins.
    fn spawn_refresh(&self) {
        let store = Arc::clone(&self.store);
        let blocklist = Arc::clone(&self.blocklist);
        tokio::spawn(async move {
            let _ = blocklist.refresh(store.as_ref()).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::refresh::interval::MAX_INTERVAL;
    use crate::store::MemoryStore;

    const KEY: &str = "MaliciousIpCheckIntervalInSeconds";

    fn scheduler(store: &Arc<MemoryStore>, blocklist: &Arc<BlocklistCache>) -> RefreshScheduler {
        RefreshScheduler::new(store.clone(), blocklist.clone(), &BlocklistConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn loads_immediately_then_on_every_tick() {
        let store = Arc::new(MemoryStore::new());
        store.set_config(KEY, "30");
        store.set_blocked("10.0.0.1", true);
        let blocklist = Arc::new(BlocklistCache::new());
        let shutdown = Shutdown::new();

        let scheduled = scheduler(&store, &blocklist).start(shutdown.subscribe()).await;
        assert_eq!(scheduled.interval, Duration::from_secs(30));
        assert!(blocklist.contains("10.0.0.1"));
        assert_eq!(store.blocklist_queries(), 1);

        store.set_blocked("10.0.0.2", true);
        time::sleep(Duration::from_secs(29)).await;
        assert_eq!(store.blocklist_queries(), 1);
        assert!(!blocklist.contains("10.0.0.2"));

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.blocklist_queries(), 2);
        assert!(blocklist.contains("10.0.0.2"));

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.blocklist_queries(), 3);

        shutdown.trigger();
        scheduled.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_is_not_reread_after_startup() {
        let store = Arc::new(MemoryStore::new());
        let blocklist = Arc::new(BlocklistCache::new());
        let shutdown = Shutdown::new();

        let scheduled = scheduler(&store, &blocklist).start(shutdown.subscribe()).await;
        assert_eq!(scheduled.interval, Duration::from_secs(60));

        store.set_config(KEY, "5");
        time::sleep(Duration::from_secs(59)).await;
        assert_eq!(store.blocklist_queries(), 1);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.blocklist_queries(), 2);

        shutdown.trigger();
        scheduled.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_startup_load_does_not_stop_the_timer() {
        let store = Arc::new(MemoryStore::new());
        store.set_config(KEY, "10");
        store.set_blocked("10.0.0.1", true);
        store.set_fail_reads(true);
        let blocklist = Arc::new(BlocklistCache::new());
        let shutdown = Shutdown::new();

        let scheduled = scheduler(&store, &blocklist).start(shutdown.subscribe()).await;
        // Config read failed too, so the default applies
        assert_eq!(scheduled.interval, Duration::from_secs(60));
        assert!(blocklist.is_empty());

        store.set_fail_reads(false);
        time::sleep(Duration::from_secs(61)).await;
        assert!(blocklist.contains("10.0.0.1"));

        shutdown.trigger();
        scheduled.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_interval_is_clamped_and_keeps_ticking() {
        let store = Arc::new(MemoryStore::new());
        store.set_config(KEY, "18446744073709551615");
        let blocklist = Arc::new(BlocklistCache::new());
        let shutdown = Shutdown::new();

        let scheduled = scheduler(&store, &blocklist).start(shutdown.subscribe()).await;
        assert_eq!(scheduled.interval, MAX_INTERVAL);

        store.set_blocked("10.0.0.3", true);
        time::sleep(MAX_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(store.blocklist_queries(), 2);
        assert!(blocklist.contains("10.0.0.3"));
        assert!(!scheduled.task.is_finished());

        shutdown.trigger();
        scheduled.task.await.unwrap();
    }
}
