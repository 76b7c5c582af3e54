//! InMemorySpatialStore - HashMap-backed pin store with a grid index.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::grid::{GridIndex, DEFAULT_CELL_DEGREES};
use super::SpatialStore;
use crate::error::PinError;
use crate::model::{Pin, ViewportRect};

struct Inner {
    pins: HashMap<String, Pin>,
    grid: GridIndex,
}

impl Inner {
    fn index(&mut self, pin: &Pin) {
        if pin.is_point() {
            self.grid.insert(&pin.id, pin.longitude(), pin.latitude());
        }
    }

    fn unindex(&mut self, pin: &Pin) {
        if pin.is_point() {
            self.grid.remove(&pin.id, pin.longitude(), pin.latitude());
        }
    }
}

/// In-memory spatial store.
///
/// Clone-friendly via Arc; clones share storage. Readers run concurrently,
/// writers are serialized by the RwLock.
#[derive(Clone)]
pub struct InMemorySpatialStore {
    inner: Arc<RwLock<Inner>>,
}

impl Default for InMemorySpatialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySpatialStore {
    /// Create an empty store with one-degree grid cells.
    pub fn new() -> Self {
        Self::with_cell_size(DEFAULT_CELL_DEGREES)
    }

    /// Create an empty store with the given grid cell size in degrees.
    pub fn with_cell_size(cell_degrees: f64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                pins: HashMap::new(),
                grid: GridIndex::new(cell_degrees),
            })),
        }
    }

    /// Effective grid cell size after fallback for invalid values.
    pub fn cell_size(&self) -> Result<f64, PinError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| PinError::lock_poisoned("read"))?;
        Ok(inner.grid.cell_degrees())
    }
}

impl SpatialStore for InMemorySpatialStore {
    fn insert(&self, pin: Pin) -> Result<String, PinError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| PinError::lock_poisoned("write"))?;

        if inner.pins.contains_key(&pin.id) {
            return Err(PinError::Storage(format!("duplicate pin id {}", pin.id)));
        }

        let id = pin.id.clone();
        inner.index(&pin);
        inner.pins.insert(id.clone(), pin);
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Option<Pin>, PinError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| PinError::lock_poisoned("read"))?;
        Ok(inner.pins.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Pin>, PinError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| PinError::lock_poisoned("read"))?;
        Ok(inner.pins.values().cloned().collect())
    }

    fn update(
        &self,
        id: &str,
        apply: &dyn Fn(&mut Pin) -> Result<(), PinError>,
    ) -> Result<Option<Pin>, PinError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| PinError::lock_poisoned("write"))?;

        let Some(current) = inner.pins.get(id).cloned() else {
            return Ok(None);
        };

        let mut next = current.clone();
        apply(&mut next)?;
        // Identity is immutable.
        next.id = current.id.clone();

        inner.unindex(&current);
        inner.index(&next);
        inner.pins.insert(next.id.clone(), next.clone());
        Ok(Some(next))
    }

    fn delete(&self, id: &str) -> Result<Option<Pin>, PinError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| PinError::lock_poisoned("write"))?;

        let removed = inner.pins.remove(id);
        if let Some(pin) = &removed {
            inner.unindex(pin);
        }
        Ok(removed)
    }

    fn query_bounding_box(&self, rect: &ViewportRect) -> Result<Vec<Pin>, PinError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| PinError::lock_poisoned("read"))?;

        let results = inner
            .grid
            .candidates(rect)
            .into_iter()
            .filter_map(|id| inner.pins.get(id))
            .filter(|pin| pin.is_point() && rect.contains(pin.longitude(), pin.latitude()))
            .cloned()
            .collect();

        Ok(results)
    }

    fn len(&self) -> Result<usize, PinError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| PinError::lock_poisoned("read"))?;
        Ok(inner.pins.len())
    }
}
