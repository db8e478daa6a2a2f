//! Order placement and cancellation orchestration.
//!
//! No single transaction spans the order database and the remote
//! fulfillment locations, so both placement and cancellation run as
//! multi-step sagas with explicit compensation:
//!
//! - [`OrderPlacementOrchestrator`] binds every requested item to the
//!   nearest location with stock and confirms each resulting line remotely,
//!   or compensates so that no trace of the order remains.
//! - [`OrderCancellationOrchestrator`] drives the three-phase
//!   start/confirm/revert cancellation protocol per line.
//! - [`PendingCancellationReconciler`] retries remote confirm-cancel calls
//!   that failed after the local cancel was already committed.

pub mod cancellation;
pub mod error;
pub mod placement;
pub mod reconciler;
pub mod services;

pub use cancellation::{CancellationOutcome, OrderCancellationOrchestrator};
pub use error::OrchestratorError;
pub use placement::{
    OrderPlacementOrchestrator, PlacementOutcome, PlacementRequest, RequestedItem,
};
pub use reconciler::{PendingCancellationReconciler, ReconcilerHandle};
pub use services::{
    InMemoryLocationService, InMemoryNotifier, LocationService, Notifier,
};
