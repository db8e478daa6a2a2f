//! Location directory client trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::location::OrderLocation;

/// Errors returned by the location directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory could not be reached or answered with garbage.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Remote directory of all fulfillment locations.
///
/// Consumed only by the cache refresh; orchestration reads the cache.
#[async_trait]
pub trait LocationDirectory: Send + Sync {
    /// Fetches the full location list.
    async fn fetch_all(&self) -> Result<Vec<OrderLocation>, DirectoryError>;
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    locations: Vec<OrderLocation>,
    fail_on_fetch: bool,
    fetch_count: u32,
}

/// In-memory location directory for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocationDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

impl InMemoryLocationDirectory {
    /// Creates a directory serving the given locations.
    pub fn new(locations: Vec<OrderLocation>) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryDirectoryState {
                locations,
                ..Default::default()
            })),
        }
    }

    /// Replaces the directory contents served by subsequent fetches.
    pub fn set_locations(&self, locations: Vec<OrderLocation>) {
        self.state.write().unwrap().locations = locations;
    }

    /// Configures the directory to fail fetches.
    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_fetch = fail;
    }

    /// Returns how many fetches have been attempted.
    pub fn fetch_count(&self) -> u32 {
        self.state.read().unwrap().fetch_count
    }
}

#[async_trait]
impl LocationDirectory for InMemoryLocationDirectory {
    async fn fetch_all(&self) -> Result<Vec<OrderLocation>, DirectoryError> {
        let mut state = self.state.write().unwrap();
        state.fetch_count += 1;

        if state.fail_on_fetch {
            return Err(DirectoryError::Unavailable(
                "injected fetch failure".to_string(),
            ));
        }

        Ok(state.locations.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{GridPosition, LocationId};

    #[tokio::test]
    async fn test_fetch_returns_locations() {
        let loc = OrderLocation::new(LocationId::new(), GridPosition::new(1.0, 2.0));
        let directory = InMemoryLocationDirectory::new(vec![loc.clone()]);

        let fetched = directory.fetch_all().await.unwrap();
        assert_eq!(fetched, vec![loc]);
        assert_eq!(directory.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_fetch() {
        let directory = InMemoryLocationDirectory::new(vec![]);
        directory.set_fail_on_fetch(true);

        assert!(directory.fetch_all().await.is_err());
        assert_eq!(directory.fetch_count(), 1);
    }
}
