//! SpatialStore - Storage for pin records with bounding-box containment queries.
//!
//! The store assumes rectangles are already validated; `ViewportQueryService`
//! is the single point that rejects malformed viewports.

mod grid;
mod in_memory;

use crate::error::PinError;
use crate::model::{Pin, ViewportRect};

pub use in_memory::InMemorySpatialStore;

/// Abstract storage for pins.
///
/// Lookups on unknown ids return `Ok(None)`; `Err` is reserved for storage
/// failures. Result order of `list` and `query_bounding_box` is unspecified.
pub trait SpatialStore: Send + Sync {
    /// Insert a new pin. Fails if a pin with the same id already exists.
    fn insert(&self, pin: Pin) -> Result<String, PinError>;

    /// Insert several pins, each independently of the others.
    ///
    /// One result per input, in input order. A failing item does not roll back
    /// or prevent the rest.
    fn insert_batch(&self, pins: Vec<Pin>) -> Vec<Result<String, PinError>> {
        pins.into_iter().map(|pin| self.insert(pin)).collect()
    }

    /// Get a pin by id.
    fn get(&self, id: &str) -> Result<Option<Pin>, PinError>;

    /// Every stored pin.
    fn list(&self) -> Result<Vec<Pin>, PinError>;

    /// Apply `apply` to a copy of the stored pin and persist it if `apply`
    /// succeeds. Returns the updated pin, or `None` for an unknown id.
    fn update(
        &self,
        id: &str,
        apply: &dyn Fn(&mut Pin) -> Result<(), PinError>,
    ) -> Result<Option<Pin>, PinError>;

    /// Remove a pin, returning it if it existed.
    fn delete(&self, id: &str) -> Result<Option<Pin>, PinError>;

    /// All point pins inside `rect`, antimeridian-crossing rects included.
    fn query_bounding_box(&self, rect: &ViewportRect) -> Result<Vec<Pin>, PinError>;

    /// Number of stored pins.
    fn len(&self) -> Result<usize, PinError> {
        Ok(self.list()?.len())
    }

    fn is_empty(&self) -> Result<bool, PinError> {
        Ok(self.len()? == 0)
    }
}
