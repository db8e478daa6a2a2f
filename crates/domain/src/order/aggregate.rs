//! The order aggregate.

use chrono::{DateTime, Utc};
use common::{CustomerId, GridPosition, Money, OrderId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::order::state::OrderState;

/// A customer order.
///
/// Owned exclusively by the order store; mutated only by the placement and
/// cancellation orchestrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identity.
    pub id: OrderId,

    /// The customer who placed the order.
    pub customer_id: CustomerId,

    /// Shipping address projected onto the grid.
    pub shipping: GridPosition,

    /// Billing address projected onto the grid.
    pub billing: GridPosition,

    /// When the order was placed.
    pub placed_at: DateTime<Utc>,

    /// Aggregate price across all requested items.
    pub total_price: Money,

    /// Aggregate quantity across all requested items.
    pub total_quantity: u32,

    /// Lifecycle state.
    pub state: OrderState,
}

impl Order {
    /// Creates a new order in the `Placed` state, stamped with the current time.
    pub fn place(
        customer_id: CustomerId,
        shipping: GridPosition,
        billing: GridPosition,
        total_price: Money,
        total_quantity: u32,
    ) -> Self {
        Self {
            id: OrderId::new(),
            customer_id,
            shipping,
            billing,
            placed_at: Utc::now(),
            total_price,
            total_quantity,
            state: OrderState::Placed,
        }
    }

    /// Moves the order into `Processing` once its lines exist.
    pub fn start_processing(&mut self) -> Result<(), DomainError> {
        self.transition(OrderState::Placed, OrderState::Processing)
    }

    /// Marks the order `Processed` after every line is location-confirmed.
    pub fn mark_processed(&mut self) -> Result<(), DomainError> {
        self.transition(OrderState::Processing, OrderState::Processed)
    }

    /// Cancels the order. Valid only while fulfillment has not progressed
    /// past `Processed`.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if !self.state.can_cancel() {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.as_str(),
                to: OrderState::Cancelled.as_str(),
            });
        }
        self.state = OrderState::Cancelled;
        Ok(())
    }

    fn transition(&mut self, expected: OrderState, next: OrderState) -> Result<(), DomainError> {
        if self.state != expected {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        self.state = next;
        Ok(())
    }
}
