use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{LineState, Order, OrderItem, OrderLine, OrderLineId, OrderProblem, OrderState};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{OrderStore, StagedWrite};

/// Committed rows. Items, lines, and problems keep insertion order so reads
/// are deterministic across runs.
#[derive(Debug, Clone, Default)]
struct Committed {
    orders: HashMap<OrderId, Order>,
    items: Vec<OrderItem>,
    lines: Vec<OrderLine>,
    problems: Vec<OrderProblem>,
}

impl Committed {
    fn apply(&mut self, write: StagedWrite) -> Result<()> {
        match write {
            StagedWrite::InsertOrder(order) => {
                self.orders.insert(order.id, order);
            }
            StagedWrite::InsertItems(items) => {
                self.items.extend(items);
            }
            StagedWrite::InsertLines(lines) => {
                self.lines.extend(lines);
            }
            StagedWrite::InsertProblem(problem) => {
                self.problems.push(problem);
            }
            StagedWrite::UpdateOrderState(order_id, state) => {
                let order =
                    self.orders
                        .get_mut(&order_id)
                        .ok_or_else(|| StoreError::MissingRecord {
                            kind: "Order",
                            id: order_id.to_string(),
                        })?;
                order.state = state;
            }
            StagedWrite::UpdateLineState(line_id, state) => {
                self.line_mut(line_id)?.state = state;
            }
            StagedWrite::SetLinePendingCancel(line_id) => {
                self.line_mut(line_id)?.pending_cancel = true;
            }
            StagedWrite::ClearLinePendingCancel(line_id) => {
                self.line_mut(line_id)?.pending_cancel = false;
            }
            StagedWrite::DeleteOrderData(order_id) => {
                self.orders.remove(&order_id);
                self.items.retain(|item| item.order_id != order_id);
                self.lines.retain(|line| line.order_id != order_id);
            }
        }
        Ok(())
    }

    fn line_mut(&mut self, line_id: OrderLineId) -> Result<&mut OrderLine> {
        self.lines
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or_else(|| StoreError::MissingRecord {
                kind: "OrderLine",
                id: line_id.to_string(),
            })
    }
}

#[derive(Debug, Default)]
struct State {
    committed: Committed,
    staged: Vec<StagedWrite>,
    fail_on_commit: bool,
}

/// In-memory order store for tests and local wiring.
///
/// Writes are staged and applied all-or-nothing on `commit`, giving the same
/// observable semantics as the PostgreSQL backend.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commits fail without applying anything staged.
    pub async fn set_fail_on_commit(&self, fail: bool) {
        self.state.write().await.fail_on_commit = fail;
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.committed.orders.len()
    }

    /// Returns the number of committed items.
    pub async fn item_count(&self) -> usize {
        self.state.read().await.committed.items.len()
    }

    /// Returns the number of committed lines.
    pub async fn line_count(&self) -> usize {
        self.state.read().await.committed.lines.len()
    }

    /// Returns the number of committed problems.
    pub async fn problem_count(&self) -> usize {
        self.state.read().await.committed.problems.len()
    }

    /// Returns the number of committed lines flagged pending-cancel.
    pub async fn pending_cancel_count(&self) -> usize {
        self.state
            .read()
            .await
            .committed
            .lines
            .iter()
            .filter(|line| line.pending_cancel)
            .count()
    }

    async fn stage(&self, write: StagedWrite) -> Result<()> {
        self.state.write().await.staged.push(write);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, order: Order) -> Result<()> {
        self.stage(StagedWrite::InsertOrder(order)).await
    }

    async fn insert_items(&self, items: Vec<OrderItem>) -> Result<()> {
        self.stage(StagedWrite::InsertItems(items)).await
    }

    async fn insert_lines(&self, lines: Vec<OrderLine>) -> Result<()> {
        self.stage(StagedWrite::InsertLines(lines)).await
    }

    async fn insert_problem(&self, problem: OrderProblem) -> Result<()> {
        self.stage(StagedWrite::InsertProblem(problem)).await
    }

    async fn update_order_state(&self, order_id: OrderId, state: OrderState) -> Result<()> {
        self.stage(StagedWrite::UpdateOrderState(order_id, state))
            .await
    }

    async fn update_line_state(&self, line_id: OrderLineId, state: LineState) -> Result<()> {
        self.stage(StagedWrite::UpdateLineState(line_id, state))
            .await
    }

    async fn set_line_pending_cancel(&self, line_id: OrderLineId) -> Result<()> {
        self.stage(StagedWrite::SetLinePendingCancel(line_id)).await
    }

    async fn clear_line_pending_cancel(&self, line_id: OrderLineId) -> Result<()> {
        self.stage(StagedWrite::ClearLinePendingCancel(line_id))
            .await
    }

    async fn delete_order_data(&self, order_id: OrderId) -> Result<()> {
        self.stage(StagedWrite::DeleteOrderData(order_id)).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .state
            .read()
            .await
            .committed
            .orders
            .get(&order_id)
            .cloned())
    }

    async fn get_items_for_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        Ok(self
            .state
            .read()
            .await
            .committed
            .items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn get_lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        Ok(self
            .state
            .read()
            .await
            .committed
            .lines
            .iter()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn get_problems_for_order(&self, order_id: OrderId) -> Result<Vec<OrderProblem>> {
        Ok(self
            .state
            .read()
            .await
            .committed
            .problems
            .iter()
            .filter(|problem| problem.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn get_pending_cancel_lines(&self) -> Result<Vec<OrderLine>> {
        Ok(self
            .state
            .read()
            .await
            .committed
            .lines
            .iter()
            .filter(|line| line.pending_cancel)
            .cloned()
            .collect())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let staged = std::mem::take(&mut state.staged);

        if state.fail_on_commit {
            return Err(StoreError::CommitFailed(
                "injected commit failure".to_string(),
            ));
        }

        // Apply against a copy so a mid-batch error leaves committed state
        // untouched.
        let mut next = state.committed.clone();
        for write in staged {
            next.apply(write)?;
        }
        state.committed = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, GridPosition, LocationId, Money};
    use domain::LineItem;

    fn sample_order() -> Order {
        Order::place(
            CustomerId::new(),
            GridPosition::new(0.0, 0.0),
            GridPosition::new(0.0, 0.0),
            Money::from_cents(1000),
            1,
        )
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.id;

        store.insert_order(order).await.unwrap();
        assert!(store.get_order(order_id).await.unwrap().is_none());

        store.commit().await.unwrap();
        assert!(store.get_order(order_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_commit_discards_staged_writes() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.id;

        store.set_fail_on_commit(true).await;
        store.insert_order(order).await.unwrap();
        assert!(matches!(
            store.commit().await,
            Err(StoreError::CommitFailed(_))
        ));

        // Nothing applied, and the staged buffer is gone: a later commit
        // does not resurrect the order.
        store.set_fail_on_commit(false).await;
        store.commit().await.unwrap();
        assert!(store.get_order(order_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_order_data_keeps_problems() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.id;

        store.insert_order(order).await.unwrap();
        store
            .insert_items(vec![OrderItem::new(
                order_id,
                "SKU-001",
                1,
                Money::from_cents(1000),
            )])
            .await
            .unwrap();
        store
            .insert_problem(OrderProblem::record(order_id, None, "cancel failed"))
            .await
            .unwrap();
        store.commit().await.unwrap();

        store.delete_order_data(order_id).await.unwrap();
        store.commit().await.unwrap();

        assert!(store.get_order(order_id).await.unwrap().is_none());
        assert_eq!(store.get_items_for_order(order_id).await.unwrap().len(), 0);
        assert_eq!(
            store.get_problems_for_order(order_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_missing_line_fails_commit() {
        let store = InMemoryOrderStore::new();
        store
            .update_line_state(OrderLineId::new(), LineState::Cancelled)
            .await
            .unwrap();
        assert!(matches!(
            store.commit().await,
            Err(StoreError::MissingRecord { .. })
        ));
    }

    #[tokio::test]
    async fn test_pending_cancel_flag_roundtrip() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.id;
        let line = OrderLine::new(order_id, LocationId::new(), vec![LineItem::new("SKU-001", 1)]);
        let line_id = line.id;

        store.insert_order(order).await.unwrap();
        store.insert_lines(vec![line]).await.unwrap();
        store.commit().await.unwrap();
        assert_eq!(store.get_pending_cancel_lines().await.unwrap().len(), 0);

        store.set_line_pending_cancel(line_id).await.unwrap();
        store.commit().await.unwrap();
        let pending = store.get_pending_cancel_lines().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, line_id);

        store.clear_line_pending_cancel(line_id).await.unwrap();
        store.commit().await.unwrap();
        assert_eq!(store.get_pending_cancel_lines().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_mid_batch_error_applies_nothing() {
        let store = InMemoryOrderStore::new();
        let order = sample_order();
        let order_id = order.id;

        store.insert_order(order).await.unwrap();
        // Update against a line that does not exist poisons the whole batch.
        store
            .update_line_state(OrderLineId::new(), LineState::Cancelled)
            .await
            .unwrap();
        assert!(store.commit().await.is_err());
        assert!(store.get_order(order_id).await.unwrap().is_none());
    }
}
