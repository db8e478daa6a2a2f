//! Location cache read endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use order_store::OrderStore;
use serde::Serialize;

use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct LocationResponse {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// GET /locations — lists the currently cached fulfillment locations.
pub async fn list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<LocationResponse>> {
    let snapshot = state.cache.snapshot();
    Json(
        snapshot
            .locations
            .iter()
            .map(|location| LocationResponse {
                id: location.id.to_string(),
                x: location.position.x,
                y: location.position.y,
            })
            .collect(),
    )
}
