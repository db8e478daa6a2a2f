//! Shared snapshot cache of fulfillment locations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use common::LocationId;

use crate::directory::{DirectoryError, LocationDirectory};
use crate::location::OrderLocation;

/// One immutable view of the location directory.
///
/// `locations` preserves directory order, which makes downstream iteration
/// (and therefore nearest-location tie-breaking) deterministic for an
/// unchanged directory.
#[derive(Debug, Default)]
pub struct LocationSnapshot {
    /// All locations in directory order.
    pub locations: Vec<OrderLocation>,

    /// The same locations indexed by id.
    pub by_id: HashMap<LocationId, OrderLocation>,
}

impl LocationSnapshot {
    fn from_locations(locations: Vec<OrderLocation>) -> Self {
        let by_id = locations
            .iter()
            .map(|location| (location.id, location.clone()))
            .collect();
        Self { locations, by_id }
    }
}

/// In-memory cache of all known fulfillment locations.
///
/// The snapshot is swapped wholesale on a successful refresh and retained
/// on a failed one. Readers clone the inner `Arc` and never block on
/// network I/O or observe a torn snapshot.
#[derive(Clone, Default)]
pub struct LocationCache {
    snapshot: Arc<RwLock<Arc<LocationSnapshot>>>,
}

impl LocationCache {
    /// Creates an empty cache. It stays empty until the first successful
    /// refresh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the full location list from the directory and atomically
    /// swaps the snapshot on success.
    ///
    /// On failure the previous snapshot is retained; the error is returned
    /// for the caller's operational log and has no other effect.
    pub async fn refresh<D>(&self, directory: &D) -> Result<(), DirectoryError>
    where
        D: LocationDirectory + ?Sized,
    {
        let locations = directory.fetch_all().await?;
        let next = Arc::new(LocationSnapshot::from_locations(locations));

        let count = next.locations.len();
        *self.snapshot.write().unwrap() = next;

        metrics::gauge!("location_cache_size").set(count as f64);
        tracing::debug!(locations = count, "location cache refreshed");
        Ok(())
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<LocationSnapshot> {
        self.snapshot.read().unwrap().clone()
    }

    /// Looks up a location by id in the current snapshot.
    pub fn location_by_id(&self, id: LocationId) -> Option<OrderLocation> {
        self.snapshot().by_id.get(&id).cloned()
    }

    /// Returns the number of cached locations.
    pub fn location_count(&self) -> usize {
        self.snapshot().locations.len()
    }
}
