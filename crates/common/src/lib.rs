//! Shared identifiers and value types used across the fulfillment system.

pub mod grid;
pub mod money;
pub mod types;

pub use grid::GridPosition;
pub use money::Money;
pub use types::{CustomerId, LocationId, OrderId, ProductId};
