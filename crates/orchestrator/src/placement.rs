//! The order placement saga.

use common::{CustomerId, GridPosition, LocationId, Money, OrderId, ProductId};
use domain::{LineItem, LineState, Order, OrderItem, OrderLine, OrderProblem, OrderState};
use locations::{LocationCache, LocationSnapshot};
use order_store::OrderStore;

use crate::error::{OrchestratorError, Result};
use crate::services::location::LocationService;
use crate::services::notifier::Notifier;

/// A placement request as handed over by the HTTP layer.
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    /// The ordering customer.
    pub customer_id: CustomerId,

    /// Shipping address on the grid; drives location selection.
    pub shipping: GridPosition,

    /// Billing address on the grid.
    pub billing: GridPosition,

    /// The requested products.
    pub items: Vec<RequestedItem>,
}

/// One requested product of a placement request.
#[derive(Debug, Clone)]
pub struct RequestedItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

/// The two valid outcomes of a placement.
///
/// `Unavailable` is a successfully handled result, not an operation
/// failure: the order leaves no trace and the caller gets the full list of
/// products no location could fulfill.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    /// Every item is bound to a confirmed location and the order is
    /// committed as `Processed`.
    Placed { order_id: OrderId },

    /// At least one item had no qualifying location; nothing persists.
    Unavailable { product_ids: Vec<ProductId> },
}

/// Drives the placement saga: order → items → location assignment →
/// line grouping → remote confirmation, compensating on any step failure
/// so that a failed placement leaves no trace.
pub struct OrderPlacementOrchestrator<S, L, N>
where
    S: OrderStore,
    L: LocationService,
    N: Notifier,
{
    store: S,
    cache: LocationCache,
    locations: L,
    notifier: N,
}

impl<S, L, N> OrderPlacementOrchestrator<S, L, N>
where
    S: OrderStore,
    L: LocationService,
    N: Notifier,
{
    /// Creates a new placement orchestrator.
    pub fn new(store: S, cache: LocationCache, locations: L, notifier: N) -> Self {
        Self {
            store,
            cache,
            locations,
            notifier,
        }
    }

    /// Executes the placement saga for the given request.
    #[tracing::instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn place(&self, request: PlacementRequest) -> Result<PlacementOutcome> {
        metrics::counter!("order_placements_total").increment(1);
        let saga_start = std::time::Instant::now();

        // 1. Construct and persist the order aggregate
        let mut total_price = Money::zero();
        let mut total_quantity = 0u32;
        for item in &request.items {
            total_price += item.unit_price.multiply(item.quantity);
            total_quantity += item.quantity;
        }
        let order = Order::place(
            request.customer_id,
            request.shipping,
            request.billing,
            total_price,
            total_quantity,
        );
        let order_id = order.id;
        self.store.insert_order(order.clone()).await?;
        self.store.commit().await?;

        // 2. Persist one item per requested product
        let items: Vec<OrderItem> = request
            .items
            .iter()
            .map(|r| OrderItem::new(order_id, r.product_id.clone(), r.quantity, r.unit_price))
            .collect();
        self.store.insert_items(items.clone()).await?;
        self.store.commit().await?;

        // 3. Evaluate every item against the cached locations. Items are
        // never short-circuited: a failed item does not stop its siblings,
        // so the caller can report every unavailable product at once.
        let snapshot = self.cache.snapshot();
        let mut assigned: Vec<Option<LocationId>> = Vec::with_capacity(items.len());
        for item in &items {
            assigned.push(
                self.nearest_location(&snapshot, &item.product_id, item.quantity, request.shipping)
                    .await,
            );
        }

        // 4. Any unassignable item aborts the placement. Nothing was
        // reserved remotely yet, so compensation is local-only.
        let mut unavailable: Vec<ProductId> = Vec::new();
        for (item, location) in items.iter().zip(&assigned) {
            if location.is_none() && !unavailable.contains(&item.product_id) {
                unavailable.push(item.product_id.clone());
            }
        }
        if !unavailable.is_empty() {
            self.store.delete_order_data(order_id).await?;
            self.store.commit().await?;
            metrics::counter!("order_placements_unavailable").increment(1);
            tracing::info!(
                %order_id,
                unavailable = unavailable.len(),
                "placement rejected, items unavailable"
            );
            return Ok(PlacementOutcome::Unavailable {
                product_ids: unavailable,
            });
        }

        // 5. Group items by assigned location, one line per location in
        // first-seen order
        let mut grouped: Vec<(LocationId, Vec<LineItem>)> = Vec::new();
        for (item, location) in items.iter().zip(&assigned) {
            let Some(location_id) = *location else {
                continue;
            };
            let line_item = LineItem::new(item.product_id.clone(), item.quantity);
            match grouped.iter_mut().find(|(l, _)| *l == location_id) {
                Some((_, line_items)) => line_items.push(line_item),
                None => grouped.push((location_id, vec![line_item])),
            }
        }
        let lines: Vec<OrderLine> = grouped
            .into_iter()
            .map(|(location_id, line_items)| OrderLine::new(order_id, location_id, line_items))
            .collect();
        self.store.insert_lines(lines.clone()).await?;
        self.store
            .update_order_state(order_id, OrderState::Processing)
            .await?;
        self.store.commit().await?;

        // 6. Confirm every line at its location; the first failure
        // triggers compensation for all lines
        for line in &lines {
            if let Err(e) = self.locations.place_order_line(line).await {
                tracing::warn!(
                    %order_id,
                    line_id = %line.id,
                    error = %e,
                    "line placement failed, compensating"
                );
                return Err(self.compensate(order_id, &lines, e).await);
            }
        }

        // 7. Mark everything processed; a persistence failure here still
        // has to unwind the remote placements
        let mark_processed = async {
            self.store
                .update_order_state(order_id, OrderState::Processed)
                .await?;
            for line in &lines {
                self.store
                    .update_line_state(line.id, LineState::Processed)
                    .await?;
            }
            self.store.commit().await
        };
        if let Err(e) = mark_processed.await {
            return Err(
                self.compensate(order_id, &lines, OrchestratorError::Store(e))
                    .await,
            );
        }

        if let Err(e) = self.notifier.send_order_confirmation(&order).await {
            tracing::warn!(%order_id, error = %e, "order confirmation notification failed");
        }

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("order_placement_duration_seconds").record(duration);
        metrics::counter!("order_placements_completed").increment(1);
        tracing::info!(%order_id, lines = lines.len(), duration, "order placed");

        Ok(PlacementOutcome::Placed { order_id })
    }

    /// Picks the closest cached location with sufficient stock for one item.
    ///
    /// Locations are visited in snapshot (directory) order and replaced only
    /// by a strictly closer candidate, so the first qualifying location wins
    /// ties. A stock-check error skips that location only; it is logged
    /// distinctly from a definitive "insufficient stock" answer.
    async fn nearest_location(
        &self,
        snapshot: &LocationSnapshot,
        product_id: &ProductId,
        quantity: u32,
        shipping: GridPosition,
    ) -> Option<LocationId> {
        let mut best: Option<(LocationId, f64)> = None;

        for location in &snapshot.locations {
            match self
                .locations
                .check_stock(location.id, product_id, quantity)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(
                        location_id = %location.id,
                        %product_id,
                        quantity,
                        "insufficient stock, skipping location"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        location_id = %location.id,
                        %product_id,
                        error = %e,
                        "stock check failed, skipping location"
                    );
                    continue;
                }
            }

            let distance = location.position.distance_to(shipping);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((location.id, distance)),
            }
        }

        best.map(|(id, _)| id)
    }

    /// Unwinds a placement whose lines already exist.
    ///
    /// None of the lines was marked processed, so each location gets a
    /// straight confirm-cancel ("this never should have been placed").
    /// Per-line cancel failures become order problems; local order data is
    /// deleted either way. Returns the error the saga should surface: the
    /// original cause when compensation ran clean, `SupportRequired` when
    /// it did not.
    async fn compensate(
        &self,
        order_id: OrderId,
        lines: &[OrderLine],
        cause: OrchestratorError,
    ) -> OrchestratorError {
        metrics::counter!("order_placement_compensations").increment(1);
        let mut unresolved = Vec::new();

        for line in lines {
            if let Err(e) = self.locations.confirm_cancel(line).await {
                tracing::error!(
                    %order_id,
                    line_id = %line.id,
                    error = %e,
                    "compensation cancel failed"
                );
                let problem = OrderProblem::record(
                    order_id,
                    Some(line.id),
                    format!("compensation confirm-cancel failed: {e}"),
                );
                if let Err(store_err) = self.store.insert_problem(problem).await {
                    tracing::error!(%order_id, error = %store_err, "failed to record order problem");
                }
                unresolved.push(line.id);
            }
        }

        let cleanup = async {
            self.store.delete_order_data(order_id).await?;
            self.store.commit().await
        };
        let cleanup_failed = match cleanup.await {
            Ok(()) => false,
            Err(e) => {
                tracing::error!(%order_id, error = %e, "compensation cleanup failed");
                true
            }
        };

        if unresolved.is_empty() && !cleanup_failed {
            metrics::counter!("order_placements_failed").increment(1);
            cause
        } else {
            metrics::counter!("order_placements_support_required").increment(1);
            OrchestratorError::SupportRequired {
                reason: format!("placement failed ({cause}) and compensation did not fully resolve"),
                unresolved_lines: unresolved,
            }
        }
    }
}
