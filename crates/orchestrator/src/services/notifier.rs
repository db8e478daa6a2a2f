//! Order confirmation notifier trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::Order;

use crate::error::OrchestratorError;

/// Sends the order confirmation to the customer.
///
/// Fire-and-forget from the saga's point of view: a failure is logged and
/// never blocks placement success.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a confirmation for a successfully placed order.
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), OrchestratorError>;
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: u32,
    fail_on_send: bool,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail sends.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the number of confirmations sent.
    pub fn sent_count(&self) -> u32 {
        self.state.read().unwrap().sent
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_send {
            return Err(OrchestratorError::Notification(format!(
                "could not notify customer {}",
                order.customer_id
            )));
        }

        state.sent += 1;
        Ok(())
    }
}
