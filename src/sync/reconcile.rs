//! MarkerReconciler - pure diff of desired pins against rendered markers.

use std::collections::{HashMap, HashSet};

use crate::model::Pin;

/// Rendered markers keyed by pin id. Holds at most one marker per id.
#[derive(Debug)]
pub struct RenderedMarkerSet<H> {
    markers: HashMap<String, H>,
}

impl<H> Default for RenderedMarkerSet<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RenderedMarkerSet<H> {
    pub fn new() -> Self {
        Self {
            markers: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.markers.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&H> {
        self.markers.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut H> {
        self.markers.get_mut(id)
    }

    /// Rendered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.markers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Track a new marker. Returns the handle back if the id is already rendered.
    pub fn insert(&mut self, id: String, handle: H) -> Result<(), H> {
        if self.markers.contains_key(&id) {
            return Err(handle);
        }
        self.markers.insert(id, handle);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<H> {
        self.markers.remove(id)
    }
}

/// Minimal marker operations to turn the rendered set into the desired one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Desired pins with no marker yet, in desired order.
    pub to_add: Vec<Pin>,
    /// Rendered ids no longer desired, sorted.
    pub to_remove: Vec<String>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff `desired` against `current`.
///
/// Ids present in both are left alone even if the pin's fields changed;
/// content updates go through the controller's explicit refresh path.
/// Duplicate ids in `desired` are added once (first occurrence wins).
pub fn reconcile<H>(desired: &[Pin], current: &RenderedMarkerSet<H>) -> ReconcilePlan {
    let wanted: HashSet<&str> = desired.iter().map(|pin| pin.id.as_str()).collect();

    let mut to_remove: Vec<String> = current
        .markers
        .keys()
        .filter(|id| !wanted.contains(id.as_str()))
        .cloned()
        .collect();
    to_remove.sort();

    let mut seen = HashSet::new();
    let to_add = desired
        .iter()
        .filter(|pin| !current.contains(&pin.id))
        .filter(|pin| {
            let pin: &Pin = *pin;
            seen.insert(pin.id.as_str())
        })
        .cloned()
        .collect();

    ReconcilePlan { to_add, to_remove }
}
