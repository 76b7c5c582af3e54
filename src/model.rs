//! Pin records and the shapes used to create, patch and query them.
//!
//! The wire format follows GeoJSON ordering: `coordinates` is `[longitude, latitude]`.
//!
//! ```ignore
//! {
//!   "id": "4f6c…",
//!   "name": "Mall of Asia, 2F",
//!   "location": { "type": "Point", "coordinates": [120.98, 14.53] },
//!   "createdAt": "2026-01-01T00:00:00Z",
//!   "updatedAt": "2026-01-01T00:00:00Z"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PinError;

pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;
pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;

/// Geometry kinds accepted on the wire. Only `Point` is ever persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Polygon,
    #[serde(rename = "Multipoint", alias = "MultiPoint")]
    MultiPoint,
}

/// A GeoJSON-style location: geometry kind plus `[longitude, latitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub coordinates: [f64; 2],
}

impl Location {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: GeometryKind::Point,
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    /// Reject non-point geometry and coordinates outside WGS84 ranges.
    pub fn validate(&self) -> Result<(), PinError> {
        if self.kind != GeometryKind::Point {
            return Err(PinError::InvalidPin(format!(
                "unsupported geometry {:?}, only Point is stored",
                self.kind
            )));
        }
        let (lon, lat) = (self.longitude(), self.latitude());
        if !lon.is_finite() || !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&lon) {
            return Err(PinError::InvalidPin(format!(
                "longitude {} outside [-180, 180]",
                lon
            )));
        }
        if !lat.is_finite() || !(MIN_LATITUDE..=MAX_LATITUDE).contains(&lat) {
            return Err(PinError::InvalidPin(format!(
                "latitude {} outside [-90, 90]",
                lat
            )));
        }
        Ok(())
    }
}

/// A persisted point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pin {
    pub fn longitude(&self) -> f64 {
        self.location.longitude()
    }

    pub fn latitude(&self) -> f64 {
        self.location.latitude()
    }

    pub fn is_point(&self) -> bool {
        self.location.kind == GeometryKind::Point
    }
}

/// Creation draft. The repository assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPin {
    pub name: String,
    pub location: Location,
}

impl NewPin {
    pub fn new(name: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            name: name.into(),
            location: Location::point(longitude, latitude),
        }
    }

    pub fn validate(&self) -> Result<(), PinError> {
        validate_name(&self.name)?;
        self.location.validate()
    }
}

/// Partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PinPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl PinPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            location: None,
        }
    }

    pub fn relocate(longitude: f64, latitude: f64) -> Self {
        Self {
            name: None,
            location: Some(Location::point(longitude, latitude)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.location.is_none()
    }

    pub fn validate(&self) -> Result<(), PinError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), PinError> {
    if name.trim().is_empty() {
        return Err(PinError::InvalidPin("name must not be empty".into()));
    }
    Ok(())
}

/// A map viewport given by its south-west and north-east corners.
///
/// `sw_lon > ne_lon` is legal and means the viewport crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportRect {
    pub sw_lon: f64,
    pub sw_lat: f64,
    pub ne_lon: f64,
    pub ne_lat: f64,
}

impl ViewportRect {
    pub fn new(sw_lon: f64, sw_lat: f64, ne_lon: f64, ne_lat: f64) -> Self {
        Self {
            sw_lon,
            sw_lat,
            ne_lon,
            ne_lat,
        }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.sw_lon > self.ne_lon
    }

    /// Containment test for a single point, inclusive on every edge.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if lat < self.sw_lat || lat > self.ne_lat {
            return false;
        }
        if self.crosses_antimeridian() {
            lon >= self.sw_lon || lon <= self.ne_lon
        } else {
            lon >= self.sw_lon && lon <= self.ne_lon
        }
    }

    /// Longitude spans covered by this rect, split in two at the antimeridian.
    pub fn longitude_spans(&self) -> Vec<(f64, f64)> {
        if self.crosses_antimeridian() {
            vec![(self.sw_lon, MAX_LONGITUDE), (MIN_LONGITUDE, self.ne_lon)]
        } else {
            vec![(self.sw_lon, self.ne_lon)]
        }
    }

    /// Check ranges and latitude ordering.
    pub fn validate(&self) -> Result<(), PinError> {
        let corners = [
            ("swLong", self.sw_lon, MIN_LONGITUDE, MAX_LONGITUDE),
            ("swLat", self.sw_lat, MIN_LATITUDE, MAX_LATITUDE),
            ("neLong", self.ne_lon, MIN_LONGITUDE, MAX_LONGITUDE),
            ("neLat", self.ne_lat, MIN_LATITUDE, MAX_LATITUDE),
        ];
        for (label, value, min, max) in corners {
            if !value.is_finite() || value < min || value > max {
                return Err(PinError::InvalidQuery(format!(
                    "{} {} outside [{}, {}]",
                    label, value, min, max
                )));
            }
        }
        if self.sw_lat > self.ne_lat {
            return Err(PinError::InvalidQuery(format!(
                "south-west latitude {} is north of north-east latitude {}",
                self.sw_lat, self.ne_lat
            )));
        }
        Ok(())
    }
}
