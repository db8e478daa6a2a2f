//! Order problems: the append-only audit trail for unresolved failures.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::line::OrderLineId;

/// Unique identifier for an order problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderProblemId(Uuid);

impl OrderProblemId {
    /// Creates a new random problem ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a problem ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderProblemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderProblemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A human-readable reason attached to an order (and optionally a line)
/// when automated compensation could not fully resolve a failure.
///
/// Problems are append-only and survive deletion of the order rows they
/// describe; support tooling reads them to drive manual intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProblem {
    /// Problem identity.
    pub id: OrderProblemId,

    /// The order the problem belongs to.
    pub order_id: OrderId,

    /// The specific line, when the problem is line-scoped.
    pub line_id: Option<OrderLineId>,

    /// Human-readable description of what could not be resolved.
    pub reason: String,

    /// When the problem was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl OrderProblem {
    /// Records a new problem against an order, stamped with the current time.
    pub fn record(
        order_id: OrderId,
        line_id: Option<OrderLineId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: OrderProblemId::new(),
            order_id,
            line_id,
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }
}
