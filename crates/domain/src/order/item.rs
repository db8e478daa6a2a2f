//! Requested order items, prior to location assignment.

use common::{Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderItemId(Uuid);

impl OrderItemId {
    /// Creates a new random order item ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an order item ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One requested product line of an order.
///
/// Created at placement time and never mutated afterwards; deleted only when
/// the whole order is compensated away before confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Item identity.
    pub id: OrderItemId,

    /// The order this item belongs to.
    pub order_id: OrderId,

    /// The requested product.
    pub product_id: ProductId,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item bound to the given order.
    pub fn new(
        order_id: OrderId,
        product_id: impl Into<ProductId>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            id: OrderItemId::new(),
            order_id,
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}
