//! Order placement, cancellation, and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::{CustomerId, GridPosition, Money, OrderId, ProductId};
use locations::LocationCache;
use orchestrator::{
    InMemoryLocationService, InMemoryNotifier, OrderCancellationOrchestrator,
    OrderPlacementOrchestrator, PlacementOutcome, PlacementRequest, RequestedItem,
};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub placement: OrderPlacementOrchestrator<S, InMemoryLocationService, InMemoryNotifier>,
    pub cancellation: OrderCancellationOrchestrator<S, InMemoryLocationService>,
    pub store: S,
    pub cache: LocationCache,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: Option<String>,
    pub shipping: GridPosition,
    pub billing: GridPosition,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderPlacedResponse {
    pub order_id: String,
    pub state: String,
}

#[derive(Serialize)]
pub struct UnavailableResponse {
    pub unavailable_product_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct OrderCancelledResponse {
    pub order_id: String,
    pub state: String,
    pub deferred_lines: Vec<String>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub state: String,
    pub placed_at: String,
    pub total_price_cents: i64,
    pub total_quantity: u32,
    pub items: Vec<ItemResponse>,
    pub lines: Vec<LineResponse>,
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct LineResponse {
    pub id: String,
    pub location_id: String,
    pub state: String,
    pub pending_cancel: bool,
    pub items: Vec<LineItemResponse>,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct ProblemResponse {
    pub id: String,
    pub line_id: Option<String>,
    pub reason: String,
    pub recorded_at: String,
}

// -- Handlers --

/// POST /orders — runs the placement saga.
///
/// 201 with the order id when placed; 409 listing the unavailable products
/// when no location can fulfill part of the request.
#[tracing::instrument(skip(state, req))]
pub async fn place<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Response, ApiError> {
    let customer_id = parse_customer_id(req.customer_id.as_deref())?;

    let request = PlacementRequest {
        customer_id,
        shipping: req.shipping,
        billing: req.billing,
        items: req
            .items
            .iter()
            .map(|item| RequestedItem {
                product_id: ProductId::new(item.product_id.as_str()),
                quantity: item.quantity,
                unit_price: Money::from_cents(item.unit_price_cents),
            })
            .collect(),
    };

    match state.placement.place(request).await? {
        PlacementOutcome::Placed { order_id } => {
            let response = OrderPlacedResponse {
                order_id: order_id.to_string(),
                state: "Processed".to_string(),
            };
            Ok((StatusCode::CREATED, Json(response)).into_response())
        }
        PlacementOutcome::Unavailable { product_ids } => {
            let response = UnavailableResponse {
                unavailable_product_ids: product_ids.iter().map(ToString::to_string).collect(),
            };
            Ok((StatusCode::CONFLICT, Json(response)).into_response())
        }
    }
}

/// POST /orders/{id}/cancel — runs the cancellation saga.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<OrderCancelledResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let reason = req.reason.unwrap_or_else(|| "customer request".to_string());

    let outcome = state.cancellation.cancel(order_id, reason).await?;

    Ok(Json(OrderCancelledResponse {
        order_id: order_id.to_string(),
        state: "Cancelled".to_string(),
        deferred_lines: outcome
            .deferred_lines
            .iter()
            .map(ToString::to_string)
            .collect(),
    }))
}

/// GET /orders/{id} — loads an order with its items and lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;

    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    let items = state.store.get_items_for_order(order_id).await?;
    let lines = state.store.get_lines_for_order(order_id).await?;

    Ok(Json(OrderResponse {
        id: order.id.to_string(),
        customer_id: order.customer_id.to_string(),
        state: order.state.to_string(),
        placed_at: order.placed_at.to_rfc3339(),
        total_price_cents: order.total_price.cents(),
        total_quantity: order.total_quantity,
        items: items
            .iter()
            .map(|item| ItemResponse {
                product_id: item.product_id.to_string(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
            })
            .collect(),
        lines: lines
            .iter()
            .map(|line| LineResponse {
                id: line.id.to_string(),
                location_id: line.location_id.to_string(),
                state: line.state.to_string(),
                pending_cancel: line.pending_cancel,
                items: line
                    .items
                    .iter()
                    .map(|item| LineItemResponse {
                        product_id: item.product_id.to_string(),
                        quantity: item.quantity,
                    })
                    .collect(),
            })
            .collect(),
    }))
}

/// GET /orders/{id}/problems — lists the audit problems of an order.
#[tracing::instrument(skip(state))]
pub async fn problems<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProblemResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let problems = state.store.get_problems_for_order(order_id).await?;

    Ok(Json(
        problems
            .iter()
            .map(|problem| ProblemResponse {
                id: problem.id.to_string(),
                line_id: problem.line_id.map(|id| id.to_string()),
                reason: problem.reason.clone(),
                recorded_at: problem.recorded_at.to_rfc3339(),
            })
            .collect(),
    ))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

fn parse_customer_id(id: Option<&str>) -> Result<CustomerId, ApiError> {
    match id {
        Some(id_str) => {
            let uuid = uuid::Uuid::parse_str(id_str)
                .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
            Ok(CustomerId::from_uuid(uuid))
        }
        None => Ok(CustomerId::new()),
    }
}
