//! The order store trait.

use async_trait::async_trait;
use common::OrderId;
use domain::{LineState, Order, OrderItem, OrderLine, OrderLineId, OrderProblem, OrderState};

use crate::error::Result;

/// A write staged against the store, applied on the next [`OrderStore::commit`].
///
/// Both backends buffer writes in this form so that commit semantics (all
/// staged writes applied together, or none) are identical between them.
#[derive(Debug, Clone)]
pub enum StagedWrite {
    InsertOrder(Order),
    InsertItems(Vec<OrderItem>),
    InsertLines(Vec<OrderLine>),
    InsertProblem(OrderProblem),
    UpdateOrderState(OrderId, OrderState),
    UpdateLineState(OrderLineId, LineState),
    SetLinePendingCancel(OrderLineId),
    ClearLinePendingCancel(OrderLineId),
    DeleteOrderData(OrderId),
}

/// Unit-of-work persistence for orders, items, lines, and problems.
///
/// Writes are staged and invisible to readers until [`commit`] succeeds.
/// A failed commit discards the staged writes without applying any of them.
/// Reads always reflect the last committed state.
///
/// [`commit`]: OrderStore::commit
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Stages an order insert.
    async fn insert_order(&self, order: Order) -> Result<()>;

    /// Stages inserts for a batch of order items.
    async fn insert_items(&self, items: Vec<OrderItem>) -> Result<()>;

    /// Stages inserts for a batch of order lines.
    async fn insert_lines(&self, lines: Vec<OrderLine>) -> Result<()>;

    /// Stages an append to the order problem audit trail.
    async fn insert_problem(&self, problem: OrderProblem) -> Result<()>;

    /// Stages an order state update.
    async fn update_order_state(&self, order_id: OrderId, state: OrderState) -> Result<()>;

    /// Stages a line state update.
    async fn update_line_state(&self, line_id: OrderLineId, state: LineState) -> Result<()>;

    /// Stages flagging a line as cancelled locally but unconfirmed remotely.
    async fn set_line_pending_cancel(&self, line_id: OrderLineId) -> Result<()>;

    /// Stages clearing the pending-cancel flag once the remote confirmed.
    async fn clear_line_pending_cancel(&self, line_id: OrderLineId) -> Result<()>;

    /// Stages deletion of the order and its items and lines.
    ///
    /// Problems recorded against the order are kept; they are the audit
    /// trail that outlives compensation.
    async fn delete_order_data(&self, order_id: OrderId) -> Result<()>;

    /// Loads a committed order by ID.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Loads the committed items of an order.
    async fn get_items_for_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Loads the committed lines of an order.
    async fn get_lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    /// Loads the committed problems recorded against an order.
    async fn get_problems_for_order(&self, order_id: OrderId) -> Result<Vec<OrderProblem>>;

    /// Loads every committed line currently flagged pending-cancel.
    async fn get_pending_cancel_lines(&self) -> Result<Vec<OrderLine>>;

    /// Applies every staged write, in staging order, as one atomic flush.
    ///
    /// On failure nothing staged was applied and the staged buffer is
    /// discarded; callers own the retry/compensation policy.
    async fn commit(&self) -> Result<()>;
}
