//! The order cancellation saga.

use common::OrderId;
use domain::{LineState, OrderLine, OrderLineId, OrderProblem, OrderState};
use order_store::OrderStore;

use crate::error::{OrchestratorError, Result};
use crate::services::location::LocationService;

/// Result of a successful cancellation.
///
/// `deferred_lines` lists lines whose remote confirm failed after the local
/// cancel was already committed; they are queued for the reconciler and do
/// not fail the call.
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationOutcome {
    pub deferred_lines: Vec<OrderLineId>,
}

/// Drives the three-phase cancellation protocol per order line:
/// `Active → StartedCancel → {ConfirmedCancel | RevertedCancel}` at the
/// remote, with the local database commit as the point of no return.
pub struct OrderCancellationOrchestrator<S, L>
where
    S: OrderStore,
    L: LocationService,
{
    store: S,
    locations: L,
}

impl<S, L> OrderCancellationOrchestrator<S, L>
where
    S: OrderStore,
    L: LocationService,
{
    /// Creates a new cancellation orchestrator.
    pub fn new(store: S, locations: L) -> Self {
        Self { store, locations }
    }

    /// Executes the cancellation saga for the given order.
    ///
    /// Failures before the database commit are fully transparent: no local
    /// or remote state changes survive. Failures after the commit are
    /// absorbed — the caller sees success and the affected lines are left
    /// to the reconciler.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        order_id: OrderId,
        reason: impl Into<String>,
    ) -> Result<CancellationOutcome> {
        metrics::counter!("order_cancellations_total").increment(1);
        let reason = reason.into();

        // 1. Load the order and its lines
        self.store
            .get_order(order_id)
            .await?
            .ok_or(OrchestratorError::OrderNotFound(order_id))?;
        let lines = self.store.get_lines_for_order(order_id).await?;
        if lines.is_empty() {
            return Err(OrchestratorError::OrderNotFound(order_id));
        }

        // 2. Precondition: every line must still be cancellable. Rejected
        // before any side effect.
        for line in &lines {
            if !line.state.can_cancel() {
                metrics::counter!("order_cancellations_rejected").increment(1);
                return Err(OrchestratorError::NotCancellable {
                    line_id: line.id,
                    state: line.state,
                });
            }
        }

        tracing::info!(%order_id, lines = lines.len(), %reason, "starting cancellation");

        // 3. Start the cancel at every location, stopping at the first
        // failure
        let mut started: Vec<&OrderLine> = Vec::new();
        for line in &lines {
            match self.locations.start_cancel(line).await {
                Ok(()) => started.push(line),
                Err(e) => {
                    // 4. Undo exactly what was started; local state is
                    // untouched.
                    tracing::warn!(
                        %order_id,
                        line_id = %line.id,
                        error = %e,
                        "start-cancel failed, reverting started lines"
                    );
                    self.revert_started(order_id, &started).await;
                    metrics::counter!("order_cancellations_failed").increment(1);
                    return Err(e);
                }
            }
        }

        // 5. Commit the cancelled state locally. This is the point of no
        // return: from here the order is cancelled no matter what the
        // remotes say.
        let mark_cancelled = async {
            self.store
                .update_order_state(order_id, OrderState::Cancelled)
                .await?;
            for line in &lines {
                self.store
                    .update_line_state(line.id, LineState::Cancelled)
                    .await?;
            }
            self.store.commit().await
        };
        if let Err(e) = mark_cancelled.await {
            // 6. Local state must match remote state, so the started
            // cancels are undone before surfacing the storage failure.
            tracing::error!(%order_id, error = %e, "cancellation commit failed, reverting remote cancels");
            self.revert_started(order_id, &started).await;
            metrics::counter!("order_cancellations_failed").increment(1);
            return Err(OrchestratorError::Store(e));
        }

        // 7. Confirm each cancel. A failed confirm is not rolled back —
        // the local state already says Cancelled — the line is handed to
        // the reconciler instead.
        let mut deferred = Vec::new();
        for line in &lines {
            if let Err(e) = self.locations.confirm_cancel(line).await {
                tracing::warn!(
                    %order_id,
                    line_id = %line.id,
                    error = %e,
                    "confirm-cancel failed, deferring to reconciler"
                );
                if let Err(store_err) = self.queue_pending_cancel(order_id, line, &reason).await {
                    tracing::error!(
                        %order_id,
                        line_id = %line.id,
                        error = %store_err,
                        "failed to queue pending cancel"
                    );
                }
                deferred.push(line.id);
            }
        }

        if deferred.is_empty() {
            metrics::counter!("order_cancellations_completed").increment(1);
        } else {
            metrics::counter!("order_cancellations_deferred").increment(1);
        }
        tracing::info!(%order_id, deferred = deferred.len(), "order cancelled");

        Ok(CancellationOutcome {
            deferred_lines: deferred,
        })
    }

    /// Reverts every line whose start-cancel was already issued, in order.
    /// Revert failures are logged; there is nothing further to unwind.
    async fn revert_started(&self, order_id: OrderId, started: &[&OrderLine]) {
        for line in started {
            if let Err(e) = self.locations.revert_cancel(line).await {
                tracing::error!(
                    %order_id,
                    line_id = %line.id,
                    error = %e,
                    "revert-cancel failed"
                );
            }
        }
    }

    /// Flags a line pending-cancel and records the problem, committing both.
    async fn queue_pending_cancel(
        &self,
        order_id: OrderId,
        line: &OrderLine,
        reason: &str,
    ) -> order_store::Result<()> {
        self.store.set_line_pending_cancel(line.id).await?;
        self.store
            .insert_problem(OrderProblem::record(
                order_id,
                Some(line.id),
                format!("cancel confirmed locally but not remotely ({reason})"),
            ))
            .await?;
        self.store.commit().await
    }
}
