//! Periodic cache refresh task.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::LocationCache;
use crate::directory::LocationDirectory;

/// Background task that refreshes a [`LocationCache`] on a fixed interval.
///
/// The first refresh runs immediately at spawn. Ticks never overlap: a
/// refresh is awaited inline before the next tick is taken. Owned by the
/// process lifecycle through the returned [`RefresherHandle`].
pub struct CacheRefresher<D> {
    cache: LocationCache,
    directory: D,
    interval: Duration,
}

impl<D> CacheRefresher<D>
where
    D: LocationDirectory + 'static,
{
    /// Creates a refresher for the given cache and directory.
    pub fn new(cache: LocationCache, directory: D, interval: Duration) -> Self {
        Self {
            cache,
            directory,
            interval,
        }
    }

    /// Spawns the refresh loop and returns its lifecycle handle.
    pub fn spawn(self) -> RefresherHandle {
        let (shutdown, mut stop) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        metrics::counter!("location_cache_refreshes_total").increment(1);
                        if let Err(e) = self.cache.refresh(&self.directory).await {
                            metrics::counter!("location_cache_refresh_failures_total").increment(1);
                            tracing::warn!(error = %e, "location cache refresh failed, keeping previous snapshot");
                        }
                    }
                    _ = stop.changed() => {
                        tracing::info!("location cache refresher stopping");
                        break;
                    }
                }
            }
        });

        RefresherHandle { shutdown, task }
    }
}

/// Handle for stopping a spawned [`CacheRefresher`].
pub struct RefresherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Signals the loop to stop and waits for the current tick to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryLocationDirectory;
    use crate::location::OrderLocation;
    use common::{GridPosition, LocationId};

    fn directory_with_one_location() -> InMemoryLocationDirectory {
        InMemoryLocationDirectory::new(vec![OrderLocation::new(
            LocationId::new(),
            GridPosition::new(1.0, 1.0),
        )])
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_refresh_runs_immediately() {
        let directory = directory_with_one_location();
        let cache = LocationCache::new();
        let handle =
            CacheRefresher::new(cache.clone(), directory.clone(), Duration::from_secs(300))
                .spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(directory.fetch_count(), 1);
        assert_eq!(cache.location_count(), 1);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_repeats_on_interval() {
        let directory = directory_with_one_location();
        let cache = LocationCache::new();
        let handle =
            CacheRefresher::new(cache.clone(), directory.clone(), Duration::from_secs(60)).spawn();

        tokio::time::sleep(Duration::from_secs(61 * 3)).await;
        assert!(directory.fetch_count() >= 3);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_loop_alive() {
        let directory = directory_with_one_location();
        let cache = LocationCache::new();
        let handle =
            CacheRefresher::new(cache.clone(), directory.clone(), Duration::from_secs(60)).spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.location_count(), 1);

        directory.set_fail_on_fetch(true);
        tokio::time::sleep(Duration::from_secs(61)).await;
        // The loop survived the failure and the snapshot is retained.
        assert!(directory.fetch_count() >= 2);
        assert_eq!(cache.location_count(), 1);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticks() {
        let directory = directory_with_one_location();
        let cache = LocationCache::new();
        let handle =
            CacheRefresher::new(cache.clone(), directory.clone(), Duration::from_secs(60)).spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.stop().await;
        let count = directory.fetch_count();

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(directory.fetch_count(), count);
    }
}
