//! Order persistence for the fulfillment system.
//!
//! The [`OrderStore`] trait is a unit of work: every write (`insert_*`,
//! `update_*`, `delete_order_data`, pending-cancel markers) is staged in
//! memory and becomes visible to readers only when [`OrderStore::commit`]
//! succeeds. Commit itself can fail, and the saga layer treats that as a
//! storage failure like any other.
//!
//! Two backends: [`InMemoryOrderStore`] for tests and local wiring, and
//! [`PostgresOrderStore`] applying the staged writes in one transaction.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{OrderStore, StagedWrite};
