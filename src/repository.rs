//! PinRepository - CRUD façade over a `SpatialStore`.
//!
//! Validates drafts, assigns ids and timestamps, and forwards to the store.
//!
//! ## Example
//!
//! ```ignore
//! use privy_pin::{InMemorySpatialStore, NewPin, PinRepository};
//!
//! let repo = PinRepository::new(InMemorySpatialStore::new());
//! let pin = repo.create(NewPin::new("SM North, 3F", 121.03, 14.65))?;
//! assert!(repo.get(&pin.id)?.is_some());
//! ```

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PinError;
use crate::model::{NewPin, Pin, PinPatch, ViewportRect};
use crate::store::SpatialStore;

/// Overall result of a batch create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

/// Per-item results of a batch create, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<Result<Pin, PinError>>,
}

impl BatchOutcome {
    /// An empty batch counts as fully successful.
    pub fn status(&self) -> BatchStatus {
        let failed = self.results.iter().filter(|r| r.is_err()).count();
        if failed == 0 {
            BatchStatus::AllSucceeded
        } else if failed == self.results.len() {
            BatchStatus::AllFailed
        } else {
            BatchStatus::PartialFailure
        }
    }

    pub fn created(&self) -> impl Iterator<Item = &Pin> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    /// Failed items with their input index.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &PinError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(index, r)| r.as_ref().err().map(|e| (index, e)))
    }
}

pub struct PinRepository<S> {
    store: S,
}

impl<S: SpatialStore> PinRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn stamp(draft: NewPin) -> Pin {
        let now = Utc::now();
        Pin {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            location: draft.location,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate and persist a single pin.
    pub fn create(&self, draft: NewPin) -> Result<Pin, PinError> {
        draft.validate()?;
        let pin = Self::stamp(draft);
        self.store.insert(pin.clone())?;
        info!(id = %pin.id, name = %pin.name, "pin created");
        Ok(pin)
    }

    /// Validate and persist several pins. Each item succeeds or fails on its own.
    pub fn create_batch(&self, drafts: Vec<NewPin>) -> BatchOutcome {
        let mut slots: Vec<Result<Pin, PinError>> = Vec::with_capacity(drafts.len());
        let mut pending = Vec::new();

        for draft in drafts {
            match draft.validate() {
                Ok(()) => {
                    let pin = Self::stamp(draft);
                    pending.push(pin.clone());
                    slots.push(Ok(pin));
                }
                Err(err) => slots.push(Err(err)),
            }
        }

        let mut stored = self.store.insert_batch(pending).into_iter();
        for slot in slots.iter_mut() {
            if slot.is_ok() {
                if let Some(Err(err)) = stored.next() {
                    *slot = Err(err);
                }
            }
        }

        let outcome = BatchOutcome { results: slots };
        let failed = outcome.failures().count();
        if failed > 0 {
            warn!(
                total = outcome.results.len(),
                failed,
                "batch create finished with failures"
            );
        } else {
            info!(total = outcome.results.len(), "batch create finished");
        }
        outcome
    }

    /// Load drafts from a JSON array and create them as a batch.
    pub fn seed_from_json(&self, json: &str) -> Result<BatchOutcome, PinError> {
        let drafts: Vec<NewPin> = serde_json::from_str(json)?;
        Ok(self.create_batch(drafts))
    }

    pub fn get(&self, id: &str) -> Result<Option<Pin>, PinError> {
        self.store.get(id)
    }

    pub fn list(&self) -> Result<Vec<Pin>, PinError> {
        self.store.list()
    }

    /// Apply a partial update. `updatedAt` never moves backwards.
    pub fn update(&self, id: &str, patch: PinPatch) -> Result<Option<Pin>, PinError> {
        patch.validate()?;

        let updated = self.store.update(id, &|pin| {
            if let Some(name) = &patch.name {
                pin.name = name.trim().to_string();
            }
            if let Some(location) = &patch.location {
                pin.location = *location;
            }
            pin.updated_at = Utc::now().max(pin.updated_at).max(pin.created_at);
            Ok(())
        })?;

        match &updated {
            Some(pin) => info!(id = %pin.id, "pin updated"),
            None => debug!(id, "update skipped, pin not found"),
        }
        Ok(updated)
    }

    /// Remove a pin, returning it. Unknown ids are `Ok(None)`.
    pub fn delete(&self, id: &str) -> Result<Option<Pin>, PinError> {
        let removed = self.store.delete(id)?;
        match &removed {
            Some(pin) => info!(id = %pin.id, "pin deleted"),
            None => debug!(id, "delete skipped, pin not found"),
        }
        Ok(removed)
    }

    /// Bounding-box lookup. The rect must already be validated.
    pub fn find_in_rect(&self, rect: &ViewportRect) -> Result<Vec<Pin>, PinError> {
        self.store.query_bounding_box(rect)
    }
}
