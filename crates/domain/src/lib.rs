//! Order data model for the fulfillment system.
//!
//! This crate owns the records the orchestration layer operates on: the
//! `Order` aggregate, its requested `OrderItem`s, the location-bound
//! `OrderLine`s, and the append-only `OrderProblem` audit trail, together
//! with the order/line state machines.

pub mod error;
pub mod order;

pub use error::DomainError;
pub use order::{
    LineItem, LineState, Order, OrderItem, OrderItemId, OrderLine, OrderLineId, OrderProblem,
    OrderProblemId, OrderState,
};
