//! Geofence evaluation on a spherical Earth.
//!
//! Distances use the haversine formula on a sphere of the Earth's mean
//! radius. Everything here is pure: no I/O, no shared state.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean Earth radius in meters.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_000.0;

/// Rejected latitude/longitude input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    /// Latitude outside `[-90, 90]` or not finite.
    #[error("latitude must be a finite number between -90 and 90, got {0}")]
    Latitude(f64),

    /// Longitude outside `[-180, 180]` or not finite.
    #[error("longitude must be a finite number between -180 and 180, got {0}")]
    Longitude(f64),

    /// Geofence radius is zero, negative or not finite.
    #[error("radius must be a positive number of meters, got {0}")]
    Radius(f64),
}

/// A validated WGS-84 latitude/longitude pair in decimal degrees.
///
/// Deserialization goes through [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Builds a coordinate, rejecting out-of-range or non-finite values.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if either component is out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Great-circle distance in meters between two coordinates.
#[must_use]
pub fn haversine_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let sin_lat = (d_lat / 2.0).sin();
    let sin_lon = (d_lon / 2.0).sin();
    let h = sin_lat.mul_add(sin_lat, lat_a.cos() * lat_b.cos() * sin_lon * sin_lon);

    // Rounding can push h marginally outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_MEAN_RADIUS_M * h.sqrt().asin()
}

/// Returns `true` when `point` lies within `radius_m` meters of `center`.
///
/// The boundary is inclusive: a point exactly on the radius passes.
#[must_use]
pub fn within_radius(point: Coordinate, center: Coordinate, radius_m: f64) -> bool {
    haversine_distance_m(point, center) <= radius_m
}

/// A circular boundary around a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    center: Coordinate,
    radius_m: f64,
}

impl Geofence {
    /// Builds a geofence.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::Radius`] if the radius is not a positive
    /// finite number.
    pub fn new(center: Coordinate, radius_m: f64) -> Result<Self, CoordinateError> {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(CoordinateError::Radius(radius_m));
        }
        Ok(Self { center, radius_m })
    }

    /// Center of the fence.
    #[must_use]
    pub const fn center(&self) -> Coordinate {
        self.center
    }

    /// Radius in meters.
    #[must_use]
    pub const fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Measures `point` against the fence, returning the distance to the
    /// center and whether the point is inside.
    #[must_use]
    pub fn evaluate(&self, point: Coordinate) -> (f64, bool) {
        let distance = haversine_distance_m(point, self.center);
        (distance, distance <= self.radius_m)
    }
}
