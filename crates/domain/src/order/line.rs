//! Order lines: products bound to a confirmed fulfillment location.

use common::{LocationId, OrderId, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::state::LineState;

/// Unique identifier for an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderLineId(Uuid);

impl OrderLineId {
    /// Creates a new random order line ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an order line ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderLineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderLineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A product assignment attached to an order line at grouping time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The assigned product.
    pub product_id: ProductId,

    /// Quantity assigned to this line's location.
    pub quantity: u32,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// The products of one order assigned to one fulfillment location.
///
/// One line exists per distinct (order, location) pair. The line is the unit
/// the remote lifecycle protocol (place, start/confirm/revert cancel)
/// operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Line identity.
    pub id: OrderLineId,

    /// The order this line belongs to.
    pub order_id: OrderId,

    /// The fulfillment location the products are bound to. Referenced a
    /// location present in the cache at assignment time.
    pub location_id: LocationId,

    /// Product assignments attached to this line.
    pub items: Vec<LineItem>,

    /// Per-line lifecycle state.
    pub state: LineState,

    /// True when the line is cancelled locally but the remote location has
    /// not yet acknowledged the cancellation.
    pub pending_cancel: bool,
}

impl OrderLine {
    /// Creates a new line in the `Processing` state.
    pub fn new(order_id: OrderId, location_id: LocationId, items: Vec<LineItem>) -> Self {
        Self {
            id: OrderLineId::new(),
            order_id,
            location_id,
            items,
            state: LineState::default(),
            pending_cancel: false,
        }
    }

    /// Total quantity across the line's product assignments.
    pub fn quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line_is_processing_and_not_pending() {
        let line = OrderLine::new(
            OrderId::new(),
            LocationId::new(),
            vec![LineItem::new("SKU-001", 2)],
        );
        assert_eq!(line.state, LineState::Processing);
        assert!(!line.pending_cancel);
    }

    #[test]
    fn test_quantity_sums_items() {
        let line = OrderLine::new(
            OrderId::new(),
            LocationId::new(),
            vec![LineItem::new("SKU-001", 2), LineItem::new("SKU-002", 3)],
        );
        assert_eq!(line.quantity(), 5);
    }

    #[test]
    fn test_line_serialization_roundtrip() {
        let line = OrderLine::new(
            OrderId::new(),
            LocationId::new(),
            vec![LineItem::new("SKU-001", 1)],
        );
        let json = serde_json::to_string(&line).unwrap();
        let deserialized: OrderLine = serde_json::from_str(&json).unwrap();
        assert_eq!(line, deserialized);
    }
}
