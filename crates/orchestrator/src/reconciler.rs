//! Background reconciliation of pending cancellations.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use order_store::OrderStore;

use crate::services::location::LocationService;

/// Closes the eventual-consistency gap left by cancellations whose remote
/// confirm failed after the local commit.
///
/// Runs on a fixed interval, independent of any request. Each tick sweeps
/// the persisted pending-cancel queue and retries the remote confirm for
/// every entry: success clears the marker, failure leaves the line queued
/// for the next tick. Indefinite best-effort retry, no backoff.
pub struct PendingCancellationReconciler<S, L>
where
    S: OrderStore,
    L: LocationService,
{
    store: S,
    locations: L,
    interval: Duration,
}

impl<S, L> PendingCancellationReconciler<S, L>
where
    S: OrderStore + 'static,
    L: LocationService + 'static,
{
    /// Creates a reconciler sweeping on the given interval.
    pub fn new(store: S, locations: L, interval: Duration) -> Self {
        Self {
            store,
            locations,
            interval,
        }
    }

    /// Runs one sweep over the pending-cancel queue.
    ///
    /// Returns the number of lines confirmed and cleared this pass.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> usize {
        let pending = match self.store.get_pending_cancel_lines().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "could not read pending-cancel queue");
                return 0;
            }
        };

        metrics::gauge!("pending_cancel_lines").set(pending.len() as f64);
        if pending.is_empty() {
            return 0;
        }

        let mut cleared = 0;
        for line in &pending {
            match self.locations.confirm_cancel(line).await {
                Ok(()) => {
                    let clear = async {
                        self.store.clear_line_pending_cancel(line.id).await?;
                        self.store.commit().await
                    };
                    match clear.await {
                        Ok(()) => {
                            cleared += 1;
                            metrics::counter!("pending_cancels_confirmed").increment(1);
                            tracing::info!(line_id = %line.id, "pending cancel confirmed");
                        }
                        Err(e) => {
                            // The remote is cancelled; clearing retries on
                            // the next tick and confirm-cancel is repeatable.
                            tracing::warn!(
                                line_id = %line.id,
                                error = %e,
                                "confirmed remotely but could not clear marker"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        line_id = %line.id,
                        error = %e,
                        "confirm-cancel still failing, leaving queued"
                    );
                }
            }
        }
        cleared
    }

    /// Spawns the sweep loop and returns its lifecycle handle.
    ///
    /// The first sweep runs immediately. Sweeps never overlap: each is
    /// awaited inline before the next tick is taken.
    pub fn spawn(self) -> ReconcilerHandle {
        let (shutdown, mut stop) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep().await;
                    }
                    _ = stop.changed() => {
                        tracing::info!("pending-cancellation reconciler stopping");
                        break;
                    }
                }
            }
        });

        ReconcilerHandle { shutdown, task }
    }
}

/// Handle for stopping a spawned [`PendingCancellationReconciler`].
pub struct ReconcilerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Signals the loop to stop and waits for the current sweep to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
