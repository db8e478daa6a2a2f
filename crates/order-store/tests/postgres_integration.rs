//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{CustomerId, GridPosition, LocationId, Money, OrderId};
use domain::{LineItem, LineState, Order, OrderItem, OrderLine, OrderProblem, OrderState};
use order_store::{OrderStore, PostgresOrderStore, StoreError};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_order_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE orders, order_items, order_lines, order_problems")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn sample_order() -> Order {
    Order::place(
        CustomerId::new(),
        GridPosition::new(1.5, -2.5),
        GridPosition::new(3.0, 4.0),
        Money::from_cents(4500),
        3,
    )
}

#[tokio::test]
#[serial]
async fn order_roundtrip_through_commit() {
    let store = get_test_store().await;
    let order = sample_order();
    let order_id = order.id;

    store.insert_order(order.clone()).await.unwrap();

    // Staged write is invisible before commit.
    assert!(store.get_order(order_id).await.unwrap().is_none());

    store.commit().await.unwrap();

    let loaded = store.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(loaded.id, order.id);
    assert_eq!(loaded.customer_id, order.customer_id);
    assert_eq!(loaded.shipping, order.shipping);
    assert_eq!(loaded.total_price, order.total_price);
    assert_eq!(loaded.total_quantity, order.total_quantity);
    assert_eq!(loaded.state, OrderState::Placed);
}

#[tokio::test]
#[serial]
async fn items_and_lines_roundtrip() {
    let store = get_test_store().await;
    let order = sample_order();
    let order_id = order.id;

    let items = vec![
        OrderItem::new(order_id, "SKU-001", 2, Money::from_cents(1000)),
        OrderItem::new(order_id, "SKU-002", 1, Money::from_cents(2500)),
    ];
    let line = OrderLine::new(
        order_id,
        LocationId::new(),
        vec![LineItem::new("SKU-001", 2), LineItem::new("SKU-002", 1)],
    );
    let line_id = line.id;

    store.insert_order(order).await.unwrap();
    store.insert_items(items.clone()).await.unwrap();
    store.insert_lines(vec![line.clone()]).await.unwrap();
    store.commit().await.unwrap();

    let loaded_items = store.get_items_for_order(order_id).await.unwrap();
    assert_eq!(loaded_items.len(), 2);
    assert_eq!(loaded_items[0].product_id.as_str(), "SKU-001");

    let loaded_lines = store.get_lines_for_order(order_id).await.unwrap();
    assert_eq!(loaded_lines.len(), 1);
    assert_eq!(loaded_lines[0].id, line_id);
    assert_eq!(loaded_lines[0].items, line.items);
    assert_eq!(loaded_lines[0].state, LineState::Processing);
    assert!(!loaded_lines[0].pending_cancel);
}

#[tokio::test]
#[serial]
async fn state_updates_apply_in_order() {
    let store = get_test_store().await;
    let order = sample_order();
    let order_id = order.id;
    let line = OrderLine::new(order_id, LocationId::new(), vec![LineItem::new("SKU-001", 1)]);
    let line_id = line.id;

    store.insert_order(order).await.unwrap();
    store.insert_lines(vec![line]).await.unwrap();
    store.commit().await.unwrap();

    store
        .update_order_state(order_id, OrderState::Processing)
        .await
        .unwrap();
    store
        .update_order_state(order_id, OrderState::Processed)
        .await
        .unwrap();
    store
        .update_line_state(line_id, LineState::Processed)
        .await
        .unwrap();
    store.commit().await.unwrap();

    let order = store.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.state, OrderState::Processed);
    let lines = store.get_lines_for_order(order_id).await.unwrap();
    assert_eq!(lines[0].state, LineState::Processed);
}

#[tokio::test]
#[serial]
async fn pending_cancel_queue_roundtrip() {
    let store = get_test_store().await;
    let order = sample_order();
    let order_id = order.id;
    let line = OrderLine::new(order_id, LocationId::new(), vec![LineItem::new("SKU-001", 1)]);
    let line_id = line.id;

    store.insert_order(order).await.unwrap();
    store.insert_lines(vec![line]).await.unwrap();
    store.set_line_pending_cancel(line_id).await.unwrap();
    store.commit().await.unwrap();

    let pending = store.get_pending_cancel_lines().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, line_id);

    store.clear_line_pending_cancel(line_id).await.unwrap();
    store.commit().await.unwrap();
    assert!(store.get_pending_cancel_lines().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn delete_order_data_keeps_problems() {
    let store = get_test_store().await;
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
        .insert_problem(OrderProblem::record(order_id, None, "confirm-cancel failed"))
        .await
        .unwrap();
    store.commit().await.unwrap();

    store.delete_order_data(order_id).await.unwrap();
    store.commit().await.unwrap();

    assert!(store.get_order(order_id).await.unwrap().is_none());
    assert!(store.get_items_for_order(order_id).await.unwrap().is_empty());
    let problems = store.get_problems_for_order(order_id).await.unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].reason, "confirm-cancel failed");
}

#[tokio::test]
#[serial]
async fn failed_commit_applies_nothing() {
    let store = get_test_store().await;
    let order = sample_order();
    let order_id = order.id;

    store.insert_order(order).await.unwrap();
    // An update against a missing line aborts the transaction.
    store
        .update_line_state(domain::OrderLineId::new(), LineState::Cancelled)
        .await
        .unwrap();

    let result = store.commit().await;
    assert!(matches!(result, Err(StoreError::MissingRecord { .. })));
    assert!(store.get_order(order_id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn commit_with_nothing_staged_is_noop() {
    let store = get_test_store().await;
    store.commit().await.unwrap();
    assert!(
        store
            .get_order(OrderId::new())
            .await
            .unwrap()
            .is_none()
    );
}
