//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::event::DEFAULT_RADIUS_M;
use crate::domain::{CircleId, EventLocation, LocationPolicy};
use crate::error::GatewayError;

/// Registered event location as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationInfoDto {
    /// Venue latitude in degrees.
    pub latitude: f64,
    /// Venue longitude in degrees.
    pub longitude: f64,
    /// Accepted radius in meters.
    pub radius: u32,
}

impl From<EventLocation> for LocationInfoDto {
    fn from(location: EventLocation) -> Self {
        Self {
            latitude: location.center.latitude(),
            longitude: location.center.longitude(),
            radius: location.radius_m,
        }
    }
}

/// Optional `?circle_id=` filter.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct CircleScopeQuery {
    /// Restrict results to one circle.
    pub circle_id: Option<CircleId>,
}

/// `?limit=` for ranked lists.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct LimitQuery {
    /// Number of entries (default 10, max 100).
    pub limit: Option<u32>,
}

/// Builds a location policy from the flat fields clients send.
///
/// Latitude and longitude must be sent together; `radius` defaults to
/// [`DEFAULT_RADIUS_M`] and is ignored when no coordinates are given.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for a half-present coordinate
/// or a location requirement without a location, and
/// [`GatewayError::InvalidCoordinate`] for out-of-range values.
pub fn location_policy(
    requires_location: bool,
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius: Option<u32>,
) -> Result<LocationPolicy, GatewayError> {
    let location = match (latitude, longitude) {
        (Some(lat), Some(lon)) => Some(EventLocation::new(
            lat,
            lon,
            radius.unwrap_or(DEFAULT_RADIUS_M),
        )?),
        (None, None) => None,
        _ => {
            return Err(GatewayError::InvalidRequest(
                "latitude and longitude must be sent together".to_string(),
            ));
        }
    };
    Ok(LocationPolicy::new(requires_location, location)?)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn radius_defaults_to_hundred_meters() {
        let Ok(policy) = location_policy(true, Some(10.0), Some(20.0), None) else {
            panic!("valid policy");
        };
        let Some(location) = policy.location() else {
            panic!("location expected");
        };
        assert_eq!(location.radius_m, 100);
        assert_eq!(LocationInfoDto::from(location).radius, 100);
    }

    #[test]
    fn half_coordinate_is_rejected() {
        let Err(GatewayError::InvalidRequest(_)) = location_policy(false, Some(1.0), None, None)
        else {
            panic!("expected InvalidRequest");
        };
    }

    #[test]
    fn requirement_without_coordinates_is_rejected() {
        let Err(GatewayError::InvalidRequest(_)) = location_policy(true, None, None, Some(50))
        else {
            panic!("expected InvalidRequest");
        };
    }

    #[test]
    fn out_of_range_latitude_is_invalid_coordinate() {
        let Err(GatewayError::InvalidCoordinate(_)) =
            location_policy(false, Some(120.0), Some(0.0), None)
        else {
            panic!("expected InvalidCoordinate");
        };
    }
}
