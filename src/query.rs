//! ViewportQueryService - validated viewport and radius lookups.

use std::sync::Arc;

use tracing::debug;

use crate::error::PinError;
use crate::model::{Pin, ViewportRect, MAX_LATITUDE, MAX_LONGITUDE, MIN_LATITUDE, MIN_LONGITUDE};
use crate::repository::PinRepository;
use crate::store::SpatialStore;

/// Mean earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance in metres between two lon/lat points.
pub fn haversine_m(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// Smallest viewport enclosing a circle of `radius_m` around a point.
///
/// Wraps across the antimeridian and widens to every longitude when the
/// circle reaches a pole.
pub fn radius_bounds(lon: f64, lat: f64, radius_m: f64) -> ViewportRect {
    let angular = radius_m / EARTH_RADIUS_M;
    let angular_deg = angular.to_degrees();
    let south = lat - angular_deg;
    let north = lat + angular_deg;

    let world_lon = (MIN_LONGITUDE, MAX_LONGITUDE);
    if south <= MIN_LATITUDE || north >= MAX_LATITUDE {
        return ViewportRect::new(
            world_lon.0,
            south.max(MIN_LATITUDE),
            world_lon.1,
            north.min(MAX_LATITUDE),
        );
    }

    let ratio = angular.sin() / lat.to_radians().cos();
    if ratio >= 1.0 {
        return ViewportRect::new(world_lon.0, south, world_lon.1, north);
    }
    let d_lon = ratio.asin().to_degrees();
    if d_lon >= 180.0 {
        return ViewportRect::new(world_lon.0, south, world_lon.1, north);
    }

    let mut west = lon - d_lon;
    let mut east = lon + d_lon;
    if west < MIN_LONGITUDE {
        west += 360.0;
    }
    if east > MAX_LONGITUDE {
        east -= 360.0;
    }
    ViewportRect::new(west, south, east, north)
}

/// Single validation point between callers and the store.
pub struct ViewportQueryService<S> {
    repo: Arc<PinRepository<S>>,
}

impl<S> Clone for ViewportQueryService<S> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<S: SpatialStore> ViewportQueryService<S> {
    pub fn new(repo: Arc<PinRepository<S>>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<PinRepository<S>> {
        &self.repo
    }

    /// Pins inside `rect`. No matches is an empty vec, never an error.
    pub fn find_in_viewport(&self, rect: &ViewportRect) -> Result<Vec<Pin>, PinError> {
        rect.validate()?;
        let pins = self.repo.find_in_rect(rect)?;
        debug!(
            sw_lon = rect.sw_lon,
            sw_lat = rect.sw_lat,
            ne_lon = rect.ne_lon,
            ne_lat = rect.ne_lat,
            antimeridian = rect.crosses_antimeridian(),
            matched = pins.len(),
            "viewport query"
        );
        Ok(pins)
    }

    /// Pins within `radius_m` metres of a point, nearest first.
    pub fn find_near(&self, lon: f64, lat: f64, radius_m: f64) -> Result<Vec<Pin>, PinError> {
        ViewportRect::new(lon, lat, lon, lat).validate()?;
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(PinError::InvalidQuery(format!(
                "radius {} must be a positive number of metres",
                radius_m
            )));
        }

        let bounds = radius_bounds(lon, lat, radius_m);
        let mut hits: Vec<(f64, Pin)> = self
            .repo
            .find_in_rect(&bounds)?
            .into_iter()
            .map(|pin| (haversine_m(lon, lat, pin.longitude(), pin.latitude()), pin))
            .filter(|(distance, _)| *distance <= radius_m)
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));

        debug!(lon, lat, radius_m, matched = hits.len(), "radius query");
        Ok(hits.into_iter().map(|(_, pin)| pin).collect())
    }
}
