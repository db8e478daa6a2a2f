//! HTTP API server with observability for the fulfillment system.
//!
//! Provides REST endpoints for order placement and cancellation, with
//! structured logging (tracing) and Prometheus metrics. The process also
//! owns the two background loops: the location cache refresher and the
//! pending-cancellation reconciler.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use locations::{CacheRefresher, InMemoryLocationDirectory, LocationCache};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{
    InMemoryLocationService, InMemoryNotifier, OrderCancellationOrchestrator,
    OrderPlacementOrchestrator, PendingCancellationReconciler,
};
use order_store::{InMemoryOrderStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::place::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/problems", get(routes::orders::problems::<S>))
        .route("/locations", get(routes::locations::list::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Fully in-memory wiring: store, directory, location service, and the two
/// unspawned background loops. The collaborator doubles are exposed so
/// integration tests (and local experiments) can seed locations and stock.
pub struct DefaultState {
    pub state: Arc<AppState<InMemoryOrderStore>>,
    pub cache: LocationCache,
    pub directory: InMemoryLocationDirectory,
    pub service: InMemoryLocationService,
    pub refresher: CacheRefresher<InMemoryLocationDirectory>,
    pub reconciler: PendingCancellationReconciler<InMemoryOrderStore, InMemoryLocationService>,
}

/// Creates the default in-memory application state.
///
/// The directory starts empty; callers seed it (tests directly, the server
/// through whatever populates its directory double) and the refresher picks
/// the contents up on its next tick.
pub fn create_default_state(config: &Config) -> DefaultState {
    let store = InMemoryOrderStore::new();
    let directory = InMemoryLocationDirectory::new(Vec::new());
    let cache = LocationCache::new();
    let service = InMemoryLocationService::new();
    let notifier = InMemoryNotifier::new();

    let placement =
        OrderPlacementOrchestrator::new(store.clone(), cache.clone(), service.clone(), notifier);
    let cancellation = OrderCancellationOrchestrator::new(store.clone(), service.clone());

    let refresher = CacheRefresher::new(
        cache.clone(),
        directory.clone(),
        Duration::from_secs(config.location_refresh_secs),
    );
    let reconciler = PendingCancellationReconciler::new(
        store.clone(),
        service.clone(),
        Duration::from_secs(config.reconcile_secs),
    );

    let state = Arc::new(AppState {
        placement,
        cancellation,
        store,
        cache: cache.clone(),
    });

    DefaultState {
        state,
        cache,
        directory,
        service,
        refresher,
        reconciler,
    }
}
