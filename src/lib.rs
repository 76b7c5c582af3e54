mod error;
mod model;
mod query;
mod repository;
mod store;

pub mod sync;

#[cfg(feature = "http")]
pub mod config;
#[cfg(feature = "http")]
pub mod http;

pub use error::PinError;
pub use model::{
    GeometryKind, Location, NewPin, Pin, PinPatch, ViewportRect, MAX_LATITUDE, MAX_LONGITUDE,
    MIN_LATITUDE, MIN_LONGITUDE,
};
pub use query::{haversine_m, radius_bounds, ViewportQueryService, EARTH_RADIUS_M};
pub use repository::{BatchOutcome, BatchStatus, PinRepository};
pub use store::{InMemorySpatialStore, SpatialStore};
pub use sync::{
    reconcile, MarkerSurface, PinSource, ReconcilePlan, RenderedMarkerSet, SyncConfig,
    SyncError, SyncHandle, ViewportSync, ViewportSyncController,
};
