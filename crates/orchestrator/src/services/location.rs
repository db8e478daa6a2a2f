//! Location service trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{LocationId, ProductId};
use domain::{OrderLine, OrderLineId};

use crate::error::OrchestratorError;

/// Per-location remote operations.
///
/// Every call crosses the network boundary independently and must be
/// assumed non-atomic with the local database. A timeout at the transport
/// layer surfaces as an error like any other failure.
#[async_trait]
pub trait LocationService: Send + Sync {
    /// Asks a location whether it can fulfill the given quantity of a product.
    ///
    /// `Ok(false)` is a definitive "insufficient stock"; `Err` means the
    /// question itself could not be answered.
    async fn check_stock(
        &self,
        location_id: LocationId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<bool, OrchestratorError>;

    /// Places an order line at its assigned location.
    async fn place_order_line(&self, line: &OrderLine) -> Result<(), OrchestratorError>;

    /// First phase of the cancellation protocol: reserve the cancel.
    async fn start_cancel(&self, line: &OrderLine) -> Result<(), OrchestratorError>;

    /// Second phase: make the cancel permanent at the location.
    async fn confirm_cancel(&self, line: &OrderLine) -> Result<(), OrchestratorError>;

    /// Second phase alternative: undo a started cancel, leaving the line
    /// active at the location.
    async fn revert_cancel(&self, line: &OrderLine) -> Result<(), OrchestratorError>;
}

#[derive(Debug, Default)]
struct InMemoryLocationState {
    stock: HashMap<(LocationId, ProductId), u32>,
    placed: HashMap<OrderLineId, OrderLine>,
    started: HashSet<OrderLineId>,
    confirmed: Vec<OrderLineId>,
    reverted: Vec<OrderLineId>,
    error_on_stock_check: HashSet<LocationId>,
    fail_place_at: HashSet<LocationId>,
    fail_start_at: HashSet<LocationId>,
    fail_revert_at: HashSet<LocationId>,
    confirm_failures_at: HashMap<LocationId, u32>,
    stock_check_count: u32,
}

/// In-memory location service for testing.
///
/// Holds per-(location, product) stock levels and failure switches for each
/// remote verb, so saga tests can fail any step of the protocol at any
/// location.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocationService {
    state: Arc<RwLock<InMemoryLocationState>>,
}

impl InMemoryLocationService {
    /// Creates a new in-memory location service with no stock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stock level for a product at a location.
    pub fn set_stock(&self, location_id: LocationId, product_id: impl Into<ProductId>, stock: u32) {
        self.state
            .write()
            .unwrap()
            .stock
            .insert((location_id, product_id.into()), stock);
    }

    /// Returns the stock level for a product at a location.
    pub fn stock_of(&self, location_id: LocationId, product_id: &ProductId) -> u32 {
        self.state
            .read()
            .unwrap()
            .stock
            .get(&(location_id, product_id.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Makes stock checks against the given location return an error
    /// instead of an answer.
    pub fn set_error_on_stock_check(&self, location_id: LocationId) {
        self.state
            .write()
            .unwrap()
            .error_on_stock_check
            .insert(location_id);
    }

    /// Makes line placement fail at the given location.
    pub fn set_fail_on_place(&self, location_id: LocationId) {
        self.state.write().unwrap().fail_place_at.insert(location_id);
    }

    /// Makes start-cancel fail at the given location.
    pub fn set_fail_on_start_cancel(&self, location_id: LocationId) {
        self.state.write().unwrap().fail_start_at.insert(location_id);
    }

    /// Makes revert-cancel fail at the given location.
    pub fn set_fail_on_revert_cancel(&self, location_id: LocationId) {
        self.state
            .write()
            .unwrap()
            .fail_revert_at
            .insert(location_id);
    }

    /// Makes the next `failures` confirm-cancel calls at the given location
    /// fail before the remote starts succeeding again. Use `u32::MAX` for a
    /// location that never recovers.
    pub fn set_confirm_failures(&self, location_id: LocationId, failures: u32) {
        self.state
            .write()
            .unwrap()
            .confirm_failures_at
            .insert(location_id, failures);
    }

    /// Number of lines currently placed (and not cancelled) remotely.
    pub fn placed_line_count(&self) -> usize {
        self.state.read().unwrap().placed.len()
    }

    /// Number of lines with a started but unresolved cancel.
    pub fn started_cancel_count(&self) -> usize {
        self.state.read().unwrap().started.len()
    }

    /// Number of confirmed cancels.
    pub fn confirmed_cancel_count(&self) -> usize {
        self.state.read().unwrap().confirmed.len()
    }

    /// Number of reverted cancels.
    pub fn reverted_cancel_count(&self) -> usize {
        self.state.read().unwrap().reverted.len()
    }

    /// Number of stock checks issued.
    pub fn stock_check_count(&self) -> u32 {
        self.state.read().unwrap().stock_check_count
    }
}

#[async_trait]
impl LocationService for InMemoryLocationService {
    async fn check_stock(
        &self,
        location_id: LocationId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<bool, OrchestratorError> {
        let mut state = self.state.write().unwrap();
        state.stock_check_count += 1;

        if state.error_on_stock_check.contains(&location_id) {
            return Err(OrchestratorError::location(
                "check_stock",
                format!("location {location_id} unreachable"),
            ));
        }

        let available = state
            .stock
            .get(&(location_id, product_id.clone()))
            .copied()
            .unwrap_or(0);
        Ok(available >= quantity)
    }

    async fn place_order_line(&self, line: &OrderLine) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if state.fail_place_at.contains(&line.location_id) {
            return Err(OrchestratorError::location(
                "place_order_line",
                format!("location {} rejected the line", line.location_id),
            ));
        }

        for item in &line.items {
            let key = (line.location_id, item.product_id.clone());
            let available = state.stock.get(&key).copied().unwrap_or(0);
            if available < item.quantity {
                return Err(OrchestratorError::location(
                    "place_order_line",
                    format!(
                        "insufficient stock for {} at {}",
                        item.product_id, line.location_id
                    ),
                ));
            }
        }
        for item in &line.items {
            let key = (line.location_id, item.product_id.clone());
            if let Some(stock) = state.stock.get_mut(&key) {
                *stock -= item.quantity;
            }
        }

        state.placed.insert(line.id, line.clone());
        Ok(())
    }

    async fn start_cancel(&self, line: &OrderLine) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if state.fail_start_at.contains(&line.location_id) {
            return Err(OrchestratorError::location(
                "start_cancel",
                format!("location {} refused start-cancel", line.location_id),
            ));
        }

        state.started.insert(line.id);
        Ok(())
    }

    async fn confirm_cancel(&self, line: &OrderLine) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if let Some(remaining) = state.confirm_failures_at.get_mut(&line.location_id) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(OrchestratorError::location(
                    "confirm_cancel",
                    format!("location {} unreachable", line.location_id),
                ));
            }
            state.confirm_failures_at.remove(&line.location_id);
        }

        state.started.remove(&line.id);
        if let Some(placed) = state.placed.remove(&line.id) {
            for item in &placed.items {
                let key = (placed.location_id, item.product_id.clone());
                *state.stock.entry(key).or_insert(0) += item.quantity;
            }
        }
        state.confirmed.push(line.id);
        Ok(())
    }

    async fn revert_cancel(&self, line: &OrderLine) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if state.fail_revert_at.contains(&line.location_id) {
            return Err(OrchestratorError::location(
                "revert_cancel",
                format!("location {} refused revert-cancel", line.location_id),
            ));
        }

        state.started.remove(&line.id);
        state.reverted.push(line.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::LineItem;

    fn line_at(location_id: LocationId, product: &str, quantity: u32) -> OrderLine {
        OrderLine::new(
            OrderId::new(),
            location_id,
            vec![LineItem::new(product, quantity)],
        )
    }

    #[tokio::test]
    async fn test_check_stock_answers_from_levels() {
        let service = InMemoryLocationService::new();
        let location = LocationId::new();
        service.set_stock(location, "SKU-001", 2);

        let product = ProductId::new("SKU-001");
        assert!(service.check_stock(location, &product, 2).await.unwrap());
        assert!(!service.check_stock(location, &product, 3).await.unwrap());
        assert_eq!(service.stock_check_count(), 2);
    }

    #[tokio::test]
    async fn test_stock_check_error_injection() {
        let service = InMemoryLocationService::new();
        let location = LocationId::new();
        service.set_error_on_stock_check(location);

        let product = ProductId::new("SKU-001");
        assert!(service.check_stock(location, &product, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_place_decrements_stock_and_confirm_cancel_restores() {
        let service = InMemoryLocationService::new();
        let location = LocationId::new();
        service.set_stock(location, "SKU-001", 5);

        let line = line_at(location, "SKU-001", 2);
        service.place_order_line(&line).await.unwrap();
        assert_eq!(service.placed_line_count(), 1);
        assert_eq!(service.stock_of(location, &ProductId::new("SKU-001")), 3);

        service.confirm_cancel(&line).await.unwrap();
        assert_eq!(service.placed_line_count(), 0);
        assert_eq!(service.stock_of(location, &ProductId::new("SKU-001")), 5);
    }

    #[tokio::test]
    async fn test_place_rejects_insufficient_stock() {
        let service = InMemoryLocationService::new();
        let location = LocationId::new();
        service.set_stock(location, "SKU-001", 1);

        let line = line_at(location, "SKU-001", 2);
        assert!(service.place_order_line(&line).await.is_err());
        assert_eq!(service.placed_line_count(), 0);
        assert_eq!(service.stock_of(location, &ProductId::new("SKU-001")), 1);
    }

    #[tokio::test]
    async fn test_start_then_revert_leaves_no_started_cancels() {
        let service = InMemoryLocationService::new();
        let location = LocationId::new();
        let line = line_at(location, "SKU-001", 1);

        service.start_cancel(&line).await.unwrap();
        assert_eq!(service.started_cancel_count(), 1);

        service.revert_cancel(&line).await.unwrap();
        assert_eq!(service.started_cancel_count(), 0);
        assert_eq!(service.reverted_cancel_count(), 1);
    }

    #[tokio::test]
    async fn test_confirm_fails_n_times_then_succeeds() {
        let service = InMemoryLocationService::new();
        let location = LocationId::new();
        service.set_confirm_failures(location, 2);

        let line = line_at(location, "SKU-001", 1);
        assert!(service.confirm_cancel(&line).await.is_err());
        assert!(service.confirm_cancel(&line).await.is_err());
        assert!(service.confirm_cancel(&line).await.is_ok());
        assert_eq!(service.confirmed_cancel_count(), 1);
    }
}
