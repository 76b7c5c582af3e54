//! Client-side viewport synchronization.
//!
//! `ViewportSyncController` decides when to query and which responses count;
//! `reconcile` turns a desired pin set into minimal marker operations;
//! `ViewportSync` runs the controller on a tokio task against a `PinSource`.

mod controller;
mod driver;
#[cfg(feature = "emitter")]
mod emitter;
#[cfg(feature = "http")]
mod http_source;
mod reconcile;
mod source;
mod surface;

use std::error::Error;
use std::fmt;

use crate::error::PinError;

pub use controller::{
    ApplyOutcome, LocalPin, LocalPinStatus, QueryGeneration, QueryTicket, SyncState,
    ViewportSyncController, LOCAL_ID_PREFIX,
};
pub use driver::{SyncConfig, SyncHandle, SyncPhase, SyncStatus, ViewportSync};
#[cfg(feature = "emitter")]
pub use emitter::{EmitterSurface, MARKER_ADDED, MARKER_REMOVED, MARKER_UPDATED};
#[cfg(feature = "http")]
pub use http_source::HttpPinSource;
pub use reconcile::{reconcile, ReconcilePlan, RenderedMarkerSet};
pub use source::PinSource;
pub use surface::MarkerSurface;

/// Errors surfaced to callers of the sync loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The dropped pin failed validation and was never shown.
    Rejected(PinError),
    /// The create request failed. The optimistic pin is still on the map.
    CreateFailed { local_id: String, source: PinError },
    /// A create request for this local pin has not completed yet.
    CreateInFlight(String),
    /// No optimistic pin with this local id.
    UnknownLocalPin(String),
    /// The sync task has stopped.
    Closed,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Rejected(err) => write!(f, "pin rejected: {}", err),
            SyncError::CreateFailed { local_id, source } => {
                write!(f, "create failed for local pin {}: {}", local_id, source)
            }
            SyncError::CreateInFlight(local_id) => {
                write!(f, "create still in flight for local pin {}", local_id)
            }
            SyncError::UnknownLocalPin(local_id) => write!(f, "unknown local pin: {}", local_id),
            SyncError::Closed => write!(f, "viewport sync stopped"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SyncError::Rejected(e) => Some(e),
            SyncError::CreateFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
