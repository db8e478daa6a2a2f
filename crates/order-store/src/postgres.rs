use async_trait::async_trait;
use common::{CustomerId, GridPosition, LocationId, Money, OrderId, ProductId};
use domain::{
    LineItem, LineState, Order, OrderItem, OrderItemId, OrderLine, OrderLineId, OrderProblem,
    OrderProblemId, OrderState,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{OrderStore, StagedWrite};

/// PostgreSQL-backed order store.
///
/// Writes are buffered in memory and applied inside a single transaction on
/// `commit`, so readers never observe a partially flushed saga step.
pub struct PostgresOrderStore {
    pool: PgPool,
    staged: Mutex<Vec<StagedWrite>>,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    async fn stage(&self, write: StagedWrite) {
        self.staged.lock().await.push(write);
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            shipping: GridPosition::new(row.try_get("shipping_x")?, row.try_get("shipping_y")?),
            billing: GridPosition::new(row.try_get("billing_x")?, row.try_get("billing_y")?),
            placed_at: row.try_get("placed_at")?,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            total_quantity: row.try_get::<i32, _>("total_quantity")? as u32,
            state: order_state_from_str(row.try_get("state")?)?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        let items_json: serde_json::Value = row.try_get("items")?;
        let items: Vec<LineItem> = serde_json::from_value(items_json)?;

        Ok(OrderLine {
            id: OrderLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            location_id: LocationId::from_uuid(row.try_get::<Uuid, _>("location_id")?),
            items,
            state: line_state_from_str(row.try_get("state")?)?,
            pending_cancel: row.try_get("pending_cancel")?,
        })
    }

    fn row_to_problem(row: PgRow) -> Result<OrderProblem> {
        Ok(OrderProblem {
            id: OrderProblemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            line_id: row
                .try_get::<Option<Uuid>, _>("line_id")?
                .map(OrderLineId::from_uuid),
            reason: row.try_get("reason")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }
}

fn order_state_from_str(s: &str) -> Result<OrderState> {
    match s {
        "Placed" => Ok(OrderState::Placed),
        "Processing" => Ok(OrderState::Processing),
        "Processed" => Ok(OrderState::Processed),
        "Shipping" => Ok(OrderState::Shipping),
        "Delivered" => Ok(OrderState::Delivered),
        "Cancelled" => Ok(OrderState::Cancelled),
        other => Err(StoreError::Decode(format!("unknown order state: {other}"))),
    }
}

fn line_state_from_str(s: &str) -> Result<LineState> {
    match s {
        "Processing" => Ok(LineState::Processing),
        "Processed" => Ok(LineState::Processed),
        "Shipping" => Ok(LineState::Shipping),
        "Delivered" => Ok(LineState::Delivered),
        "Cancelled" => Ok(LineState::Cancelled),
        other => Err(StoreError::Decode(format!("unknown line state: {other}"))),
    }
}

async fn apply_write(tx: &mut Transaction<'_, Postgres>, write: StagedWrite) -> Result<()> {
    match write {
        StagedWrite::InsertOrder(order) => {
            sqlx::query(
                r#"
                INSERT INTO orders (id, customer_id, shipping_x, shipping_y, billing_x, billing_y,
                                    placed_at, total_price_cents, total_quantity, state)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(order.customer_id.as_uuid())
            .bind(order.shipping.x)
            .bind(order.shipping.y)
            .bind(order.billing.x)
            .bind(order.billing.y)
            .bind(order.placed_at)
            .bind(order.total_price.cents())
            .bind(order.total_quantity as i32)
            .bind(order.state.as_str())
            .execute(&mut **tx)
            .await?;
        }
        StagedWrite::InsertItems(items) => {
            for item in items {
                sqlx::query(
                    r#"
                    INSERT INTO order_items (id, order_id, product_id, quantity, unit_price_cents)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(item.id.as_uuid())
                .bind(item.order_id.as_uuid())
                .bind(item.product_id.as_str())
                .bind(item.quantity as i32)
                .bind(item.unit_price.cents())
                .execute(&mut **tx)
                .await?;
            }
        }
        StagedWrite::InsertLines(lines) => {
            for line in lines {
                let items_json = serde_json::to_value(&line.items)?;
                sqlx::query(
                    r#"
                    INSERT INTO order_lines (id, order_id, location_id, items, state, pending_cancel)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(line.id.as_uuid())
                .bind(line.order_id.as_uuid())
                .bind(line.location_id.as_uuid())
                .bind(items_json)
                .bind(line.state.as_str())
                .bind(line.pending_cancel)
                .execute(&mut **tx)
                .await?;
            }
        }
        StagedWrite::InsertProblem(problem) => {
            sqlx::query(
                r#"
                INSERT INTO order_problems (id, order_id, line_id, reason, recorded_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(problem.id.as_uuid())
            .bind(problem.order_id.as_uuid())
            .bind(problem.line_id.map(|id| id.as_uuid()))
            .bind(&problem.reason)
            .bind(problem.recorded_at)
            .execute(&mut **tx)
            .await?;
        }
        StagedWrite::UpdateOrderState(order_id, state) => {
            let result = sqlx::query("UPDATE orders SET state = $2 WHERE id = $1")
                .bind(order_id.as_uuid())
                .bind(state.as_str())
                .execute(&mut **tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::MissingRecord {
                    kind: "Order",
                    id: order_id.to_string(),
                });
            }
        }
        StagedWrite::UpdateLineState(line_id, state) => {
            let result = sqlx::query("UPDATE order_lines SET state = $2 WHERE id = $1")
                .bind(line_id.as_uuid())
                .bind(state.as_str())
                .execute(&mut **tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::MissingRecord {
                    kind: "OrderLine",
                    id: line_id.to_string(),
                });
            }
        }
        StagedWrite::SetLinePendingCancel(line_id) => {
            let result = sqlx::query("UPDATE order_lines SET pending_cancel = TRUE WHERE id = $1")
                .bind(line_id.as_uuid())
                .execute(&mut **tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::MissingRecord {
                    kind: "OrderLine",
                    id: line_id.to_string(),
                });
            }
        }
        StagedWrite::ClearLinePendingCancel(line_id) => {
            let result = sqlx::query("UPDATE order_lines SET pending_cancel = FALSE WHERE id = $1")
                .bind(line_id.as_uuid())
                .execute(&mut **tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::MissingRecord {
                    kind: "OrderLine",
                    id: line_id.to_string(),
                });
            }
        }
        StagedWrite::DeleteOrderData(order_id) => {
            sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .execute(&mut **tx)
                .await?;
            sqlx::query("DELETE FROM order_items WHERE order_id = $1")
                .bind(order_id.as_uuid())
                .execute(&mut **tx)
                .await?;
            sqlx::query("DELETE FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert_order(&self, order: Order) -> Result<()> {
        self.stage(StagedWrite::InsertOrder(order)).await;
        Ok(())
    }

    async fn insert_items(&self, items: Vec<OrderItem>) -> Result<()> {
        self.stage(StagedWrite::InsertItems(items)).await;
        Ok(())
    }

    async fn insert_lines(&self, lines: Vec<OrderLine>) -> Result<()> {
        self.stage(StagedWrite::InsertLines(lines)).await;
        Ok(())
    }

    async fn insert_problem(&self, problem: OrderProblem) -> Result<()> {
        self.stage(StagedWrite::InsertProblem(problem)).await;
        Ok(())
    }

    async fn update_order_state(&self, order_id: OrderId, state: OrderState) -> Result<()> {
        self.stage(StagedWrite::UpdateOrderState(order_id, state))
            .await;
        Ok(())
    }

    async fn update_line_state(&self, line_id: OrderLineId, state: LineState) -> Result<()> {
        self.stage(StagedWrite::UpdateLineState(line_id, state))
            .await;
        Ok(())
    }

    async fn set_line_pending_cancel(&self, line_id: OrderLineId) -> Result<()> {
        self.stage(StagedWrite::SetLinePendingCancel(line_id)).await;
        Ok(())
    }

    async fn clear_line_pending_cancel(&self, line_id: OrderLineId) -> Result<()> {
        self.stage(StagedWrite::ClearLinePendingCancel(line_id))
            .await;
        Ok(())
    }

    async fn delete_order_data(&self, order_id: OrderId) -> Result<()> {
        self.stage(StagedWrite::DeleteOrderData(order_id)).await;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, shipping_x, shipping_y, billing_x, billing_y,
                   placed_at, total_price_cents, total_quantity, state
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_items_for_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY product_id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn get_lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, location_id, items, state, pending_cancel
            FROM order_lines
            WHERE order_id = $1
            ORDER BY location_id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn get_problems_for_order(&self, order_id: OrderId) -> Result<Vec<OrderProblem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, line_id, reason, recorded_at
            FROM order_problems
            WHERE order_id = $1
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_problem).collect()
    }

    async fn get_pending_cancel_lines(&self) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, location_id, items, state, pending_cancel
            FROM order_lines
            WHERE pending_cancel
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn commit(&self) -> Result<()> {
        let staged: Vec<StagedWrite> = std::mem::take(&mut *self.staged.lock().await);
        if staged.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for write in staged {
            apply_write(&mut tx, write).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
