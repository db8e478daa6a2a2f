//! Domain error types.

use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A state transition was requested that the state machine forbids.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: &'static str,
        to: &'static str,
    },
}
