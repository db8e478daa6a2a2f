//! The cached fulfillment location projection.

use common::{GridPosition, LocationId};
use serde::{Deserialize, Serialize};

/// A fulfillment location as mirrored from the remote directory.
///
/// Carries no local identity beyond the directory's: the whole set is
/// replaced wholesale on each cache refresh, never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLocation {
    /// Directory-assigned location identity.
    pub id: LocationId,

    /// The location's position on the geographic grid.
    pub position: GridPosition,
}

impl OrderLocation {
    /// Creates a location projection.
    pub fn new(id: LocationId, position: GridPosition) -> Self {
        Self { id, position }
    }
}
