//! Order and order-line state machines.

use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Placed ──► Processing ──► Processed ──► Shipping ──► Delivered
///                │              │
///                └──────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Order persisted, items not yet bound to locations.
    #[default]
    Placed,

    /// Lines exist, fulfillment locations are being confirmed.
    Processing,

    /// Every line confirmed by its fulfillment location.
    Processed,

    /// Lines have left their fulfillment locations.
    Shipping,

    /// Order delivered to the customer (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderState {
    /// Returns true if the order can be cancelled in this state.
    ///
    /// An order whose lines have left the fulfillment stage cannot be
    /// cancelled through the remote protocol anymore.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderState::Processing | OrderState::Processed)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Cancelled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Placed => "Placed",
            OrderState::Processing => "Processing",
            OrderState::Processed => "Processed",
            OrderState::Shipping => "Shipping",
            OrderState::Delivered => "Delivered",
            OrderState::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The state of a single order line, mirroring the fulfillment subset of
/// [`OrderState`].
///
/// A line is born `Processing` when its location is assigned and moves to
/// `Processed` once the location confirms the placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LineState {
    /// Line created, placement not yet confirmed by the location.
    #[default]
    Processing,

    /// Location confirmed the placement.
    Processed,

    /// Line left the fulfillment location.
    Shipping,

    /// Line delivered (terminal state).
    Delivered,

    /// Line cancelled (terminal state).
    Cancelled,
}

impl LineState {
    /// Returns true if the line can enter the cancellation protocol.
    pub fn can_cancel(&self) -> bool {
        matches!(self, LineState::Processing | LineState::Processed)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LineState::Delivered | LineState::Cancelled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineState::Processing => "Processing",
            LineState::Processed => "Processed",
            LineState::Shipping => "Shipping",
            LineState::Delivered => "Delivered",
            LineState::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for LineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order_state_is_placed() {
        assert_eq!(OrderState::default(), OrderState::Placed);
    }

    #[test]
    fn test_can_cancel_only_during_fulfillment() {
        assert!(!OrderState::Placed.can_cancel());
        assert!(OrderState::Processing.can_cancel());
        assert!(OrderState::Processed.can_cancel());
        assert!(!OrderState::Shipping.can_cancel());
        assert!(!OrderState::Delivered.can_cancel());
        assert!(!OrderState::Cancelled.can_cancel());
    }

    #[test]
    fn test_terminal_order_states() {
        assert!(!OrderState::Placed.is_terminal());
        assert!(!OrderState::Processing.is_terminal());
        assert!(!OrderState::Processed.is_terminal());
        assert!(!OrderState::Shipping.is_terminal());
        assert!(OrderState::Delivered.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
    }

    #[test]
    fn test_default_line_state_is_processing() {
        assert_eq!(LineState::default(), LineState::Processing);
    }

    #[test]
    fn test_line_can_cancel() {
        assert!(LineState::Processing.can_cancel());
        assert!(LineState::Processed.can_cancel());
        assert!(!LineState::Shipping.can_cancel());
        assert!(!LineState::Delivered.can_cancel());
        assert!(!LineState::Cancelled.can_cancel());
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderState::Processed.to_string(), "Processed");
        assert_eq!(LineState::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_serialization() {
        let state = OrderState::Processing;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: OrderState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
