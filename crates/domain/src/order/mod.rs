//! Order aggregate, its records, and the order/line state machines.

pub mod aggregate;
pub mod item;
pub mod line;
pub mod problem;
pub mod state;

pub use aggregate::Order;
pub use item::{OrderItem, OrderItemId};
pub use line::{LineItem, OrderLine, OrderLineId};
pub use problem::{OrderProblem, OrderProblemId};
pub use state::{LineState, OrderState};
