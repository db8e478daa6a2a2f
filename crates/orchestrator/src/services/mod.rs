//! Collaborator traits consumed by the sagas, with in-memory test doubles.

pub mod location;
pub mod notifier;

pub use location::{InMemoryLocationService, LocationService};
pub use notifier::{InMemoryNotifier, Notifier};
