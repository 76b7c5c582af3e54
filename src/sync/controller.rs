//! ViewportSyncController - debounce, generation and reconciliation state machine.
//!
//! The controller is runtime-agnostic: every input is a discrete event carrying
//! the current `Instant`, and every output is a value the caller acts on
//! (a deadline to sleep until, a query to issue). `ViewportSync` drives it
//! on a tokio task; tests drive it by hand.
//!
//! ```text
//!   viewport change          timer fires              response(g == current)
//! Idle ─────────────▶ Debouncing ─────────────▶ Querying(g) ─────────────▶ Idle
//!                      ▲     │ change: reset        │ change: arm debounce     │
//!                      └─────┘                      ▼                          │
//!                                         Querying(g, debounce) ──────────────▶ Debouncing
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use super::reconcile::{reconcile, RenderedMarkerSet};
use super::surface::MarkerSurface;
use super::SyncError;
use crate::error::PinError;
use crate::model::{NewPin, Pin, ViewportRect};

/// Prefix of ids given to optimistic pins before the server assigns one.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Monotonic counter tagging each issued query.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryGeneration(u64);

impl QueryGeneration {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        QueryGeneration(self.0 + 1)
    }
}

impl fmt::Display for QueryGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Debouncing {
        deadline: Instant,
    },
    /// A query is in flight. `debounce` is armed when the viewport moved
    /// after the query was issued.
    Querying {
        generation: QueryGeneration,
        debounce: Option<Instant>,
    },
}

/// A query the caller must issue, then report back via `apply_response`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryTicket {
    pub generation: QueryGeneration,
    pub rect: ViewportRect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Response matched the in-flight generation and was reconciled.
    Applied { added: usize, removed: usize },
    /// Response matched but carried an error. Markers were left as they were.
    Failed(PinError),
    /// Response belonged to a superseded (or unknown) generation.
    Discarded {
        generation: QueryGeneration,
        current: QueryGeneration,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalPinStatus {
    /// Create request submitted, no answer yet.
    Pending,
    /// Create request failed. The pin stays on the map until retried or rolled back.
    Failed(PinError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalPin {
    pub pin: Pin,
    pub status: LocalPinStatus,
}

impl LocalPin {
    pub fn draft(&self) -> NewPin {
        NewPin {
            name: self.pin.name.clone(),
            location: self.pin.location,
        }
    }
}

pub struct ViewportSyncController<M: MarkerSurface> {
    surface: M,
    markers: RenderedMarkerSet<M::Handle>,
    debounce: Duration,
    state: SyncState,
    generation: QueryGeneration,
    rect: Option<ViewportRect>,
    remote: Vec<Pin>,
    /// Confirmed creates, tagged with the latest generation issued at confirm
    /// time. Responses to that generation or older may predate the insert.
    confirmed: Vec<(QueryGeneration, Pin)>,
    local: Vec<LocalPin>,
    last_error: Option<PinError>,
}

impl<M: MarkerSurface> ViewportSyncController<M> {
    pub fn new(surface: M, debounce: Duration) -> Self {
        Self {
            surface,
            markers: RenderedMarkerSet::new(),
            debounce,
            state: SyncState::Idle,
            generation: QueryGeneration::default(),
            rect: None,
            remote: Vec::new(),
            confirmed: Vec::new(),
            local: Vec::new(),
            last_error: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Generation of the most recently issued query (0 before the first).
    pub fn generation(&self) -> QueryGeneration {
        self.generation
    }

    pub fn viewport(&self) -> Option<ViewportRect> {
        self.rect
    }

    pub fn markers(&self) -> &RenderedMarkerSet<M::Handle> {
        &self.markers
    }

    pub fn last_error(&self) -> Option<&PinError> {
        self.last_error.as_ref()
    }

    pub fn local_pins(&self) -> &[LocalPin] {
        &self.local
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut M {
        &mut self.surface
    }

    pub fn into_surface(self) -> M {
        self.surface
    }

    /// When the pending debounce timer should fire, if one is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            SyncState::Idle => None,
            SyncState::Debouncing { deadline } => Some(deadline),
            SyncState::Querying { debounce, .. } => debounce,
        }
    }

    /// Record a viewport change and (re)arm the debounce timer.
    pub fn viewport_changed(&mut self, rect: ViewportRect, now: Instant) -> Instant {
        self.rect = Some(rect);
        let deadline = now + self.debounce;
        self.state = match self.state {
            SyncState::Idle | SyncState::Debouncing { .. } => SyncState::Debouncing { deadline },
            SyncState::Querying { generation, .. } => SyncState::Querying {
                generation,
                debounce: Some(deadline),
            },
        };
        deadline
    }

    /// Issue a query if the debounce deadline has passed.
    pub fn timer_fired(&mut self, now: Instant) -> Option<QueryTicket> {
        let due = matches!(self.next_deadline(), Some(deadline) if now >= deadline);
        if !due {
            return None;
        }
        let rect = self.rect?;

        self.generation = self.generation.next();
        self.state = SyncState::Querying {
            generation: self.generation,
            debounce: None,
        };
        debug!(generation = %self.generation, "viewport query issued");
        Some(QueryTicket {
            generation: self.generation,
            rect,
        })
    }

    /// Apply a query response if it belongs to the in-flight generation.
    pub fn apply_response(
        &mut self,
        generation: QueryGeneration,
        result: Result<Vec<Pin>, PinError>,
    ) -> ApplyOutcome {
        let debounce = match self.state {
            SyncState::Querying {
                generation: in_flight,
                debounce,
            } if in_flight == generation => debounce,
            _ => {
                debug!(%generation, current = %self.generation, "stale response discarded");
                return ApplyOutcome::Discarded {
                    generation,
                    current: self.generation,
                };
            }
        };

        self.state = match debounce {
            Some(deadline) => SyncState::Debouncing { deadline },
            None => SyncState::Idle,
        };

        match result {
            Ok(pins) => {
                self.remote = pins;
                self.confirmed.retain(|(since, _)| *since >= generation);
                self.last_error = None;
                let (added, removed) = self.reconcile_markers();
                debug!(%generation, added, removed, "viewport response applied");
                ApplyOutcome::Applied { added, removed }
            }
            Err(err) => {
                warn!(%generation, error = %err, "viewport query failed, keeping markers");
                self.last_error = Some(err.clone());
                ApplyOutcome::Failed(err)
            }
        }
    }

    /// Optimistically show a user-dropped pin. Not gated by the query state.
    ///
    /// Returns the local pin; submit `LocalPin::draft` and report back with
    /// `confirm_pin` or `fail_pin`.
    pub fn drop_pin(&mut self, draft: NewPin) -> Result<Pin, SyncError> {
        draft.validate().map_err(SyncError::Rejected)?;

        let now = chrono::Utc::now();
        let pin = Pin {
            id: format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()),
            name: draft.name.trim().to_string(),
            location: draft.location,
            created_at: now,
            updated_at: now,
        };
        self.local.push(LocalPin {
            pin: pin.clone(),
            status: LocalPinStatus::Pending,
        });
        self.reconcile_markers();
        debug!(local_id = %pin.id, "local pin dropped");
        Ok(pin)
    }

    fn local_index(&self, local_id: &str) -> Result<usize, SyncError> {
        self.local
            .iter()
            .position(|local| local.pin.id == local_id)
            .ok_or_else(|| SyncError::UnknownLocalPin(local_id.to_string()))
    }

    /// Swap the optimistic pin for the server-confirmed one.
    pub fn confirm_pin(&mut self, local_id: &str, confirmed: Pin) -> Result<(), SyncError> {
        let index = self.local_index(local_id)?;
        self.local.remove(index);
        self.confirmed.retain(|(_, pin)| pin.id != confirmed.id);
        self.confirmed.push((self.generation, confirmed));
        self.reconcile_markers();
        Ok(())
    }

    /// Keep the optimistic pin but mark its create request as failed.
    pub fn fail_pin(&mut self, local_id: &str, error: PinError) -> Result<(), SyncError> {
        let index = self.local_index(local_id)?;
        warn!(local_id, error = %error, "pin create failed, keeping local pin");
        self.local[index].status = LocalPinStatus::Failed(error);
        Ok(())
    }

    /// Mark a local pin pending again and hand back its draft for resubmission.
    pub fn retry_pin(&mut self, local_id: &str) -> Result<NewPin, SyncError> {
        let index = self.local_index(local_id)?;
        self.local[index].status = LocalPinStatus::Pending;
        Ok(self.local[index].draft())
    }

    /// Drop an optimistic pin and its marker.
    pub fn rollback_pin(&mut self, local_id: &str) -> Result<Pin, SyncError> {
        let index = self.local_index(local_id)?;
        let local = self.local.remove(index);
        self.reconcile_markers();
        Ok(local.pin)
    }

    /// Explicit update path: replace the content of an already-rendered pin.
    ///
    /// A local pin keeps its local id and status; a later retry submits the
    /// refreshed content. Returns false when the pin has no marker.
    pub fn refresh_pin(&mut self, pin: &Pin) -> bool {
        let copies = self
            .remote
            .iter_mut()
            .chain(self.confirmed.iter_mut().map(|(_, pin)| pin))
            .chain(self.local.iter_mut().map(|local| &mut local.pin));
        for known in copies.filter(|known| known.id == pin.id) {
            *known = pin.clone();
        }
        match self.markers.get_mut(&pin.id) {
            Some(handle) => {
                self.surface.update_marker(handle, pin);
                true
            }
            None => false,
        }
    }

    /// Forget a server pin that was deleted elsewhere and remove its marker.
    ///
    /// Local pins are not affected; use `rollback_pin` for those.
    pub fn forget_pin(&mut self, id: &str) -> bool {
        let before = self.remote.len() + self.confirmed.len();
        self.remote.retain(|pin| pin.id != id);
        self.confirmed.retain(|(_, pin)| pin.id != id);
        let changed = self.remote.len() + self.confirmed.len() != before;
        if changed {
            self.reconcile_markers();
        }
        changed
    }

    fn desired(&self) -> Vec<Pin> {
        self.remote
            .iter()
            .chain(self.confirmed.iter().map(|(_, pin)| pin))
            .chain(self.local.iter().map(|local| &local.pin))
            .cloned()
            .collect()
    }

    fn reconcile_markers(&mut self) -> (usize, usize) {
        let desired = self.desired();
        let plan = reconcile(&desired, &self.markers);
        let (added, removed) = (plan.to_add.len(), plan.to_remove.len());

        for id in plan.to_remove {
            if let Some(handle) = self.markers.remove(&id) {
                self.surface.remove_marker(&id, handle);
            }
        }
        for pin in plan.to_add {
            let handle = self.surface.add_marker(&pin);
            if let Err(handle) = self.markers.insert(pin.id.clone(), handle) {
                self.surface.remove_marker(&pin.id, handle);
            }
        }
        (added, removed)
    }
}
