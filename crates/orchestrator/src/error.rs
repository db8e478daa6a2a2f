//! Orchestrator error types.

use common::OrderId;
use domain::{LineState, OrderLineId};
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur while driving a saga.
///
/// The variants deliberately separate the failure classes callers react to
/// differently: storage failures (retry later), remote rejections (adjust
/// the request), precondition violations (rejected before any side effect),
/// and compensation failures (manual intervention).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A line is outside the states the cancellation protocol accepts.
    #[error("Order line {line_id} cannot be cancelled in state {state}")]
    NotCancellable {
        line_id: OrderLineId,
        state: LineState,
    },

    /// Local persistence failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A remote location call failed or was rejected.
    #[error("Location service error during {operation}: {reason}")]
    Location {
        operation: &'static str,
        reason: String,
    },

    /// A compensation step itself failed; automated recovery is exhausted
    /// and the listed lines need manual follow-up.
    #[error("Manual intervention required: {reason}")]
    SupportRequired {
        reason: String,
        unresolved_lines: Vec<OrderLineId>,
    },

    /// The confirmation notifier failed.
    #[error("Notification error: {0}")]
    Notification(String),
}

impl OrchestratorError {
    /// Creates a location-service error for the given remote operation.
    pub fn location(operation: &'static str, reason: impl Into<String>) -> Self {
        OrchestratorError::Location {
            operation,
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for orchestrator results.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
