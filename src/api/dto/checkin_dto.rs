//! Check-in DTOs: scan and organizer submissions and their three response
//! shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::LocationInfoDto;
use crate::domain::{
    AttendanceId, AttendanceRecord, CheckInAttempt, CheckInCode, Coordinate, EventId,
    EventLocation, UserId,
};
use crate::error::GatewayError;

/// Request body for `POST /checkin`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInRequest {
    /// Scanned payload: a bare code or `{scheme}://event/checkin/{code}`.
    pub qr_code: String,
    /// Presenting user.
    pub user_id: UserId,
    /// Latitude of the device fix, if any.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude of the device fix, if any.
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl CheckInRequest {
    /// Extracts the code and validates the optional coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedCode`] for an unusable payload,
    /// [`GatewayError::InvalidRequest`] when only one of latitude and
    /// longitude is present, or [`GatewayError::InvalidCoordinate`] for
    /// out-of-range values.
    pub fn into_attempt(self) -> Result<CheckInAttempt, GatewayError> {
        let code = CheckInCode::extract(&self.qr_code)?;
        let coordinate = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)?),
            (None, None) => None,
            _ => {
                return Err(GatewayError::InvalidRequest(
                    "latitude and longitude must be sent together".to_string(),
                ));
            }
        };
        Ok(CheckInAttempt {
            code,
            user_id: self.user_id,
            coordinate,
        })
    }
}

/// Request body for `POST /events/{id}/checkin`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct ManualCheckInRequest {
    /// User to mark present.
    pub user_id: UserId,
}

/// The committed attendance row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInRecordDto {
    /// Attendance row id.
    pub id: AttendanceId,
    /// Attendee.
    pub user: UserId,
    /// Event attended.
    pub event: EventId,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Points awarded.
    pub points_earned: u32,
    /// `"qr"` for scans, `"manual"` for organizer check-ins.
    pub check_in_method: String,
}

impl From<&AttendanceRecord> for CheckInRecordDto {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            id: record.id,
            user: record.user_id,
            event: record.event_id,
            timestamp: record.timestamp,
            points_earned: record.points_earned,
            check_in_method: record.method.as_str().to_string(),
        }
    }
}

/// `201 Created` body of a committed check-in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInSuccessResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Points awarded.
    pub points_earned: u32,
    /// Title of the event.
    pub event_title: String,
    /// The committed row.
    pub checkin: CheckInRecordDto,
}

/// `200 OK` body when the attendee was already checked in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlreadyCheckedInResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Always `true`.
    pub already_checked_in: bool,
    /// Always `0`; nothing new was awarded.
    pub points_earned: u32,
    /// Title of the event.
    pub event_title: String,
}

/// Body of a rejected check-in (`404`, `422` or `403`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInRejection {
    /// Human-readable reason.
    pub error: String,
    /// Machine-readable reason: `invalid_code`, `location_required` or
    /// `out_of_range`.
    pub reason: String,
    /// Set when the event enforces a geofence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_location: Option<bool>,
    /// The event's registered location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_location: Option<LocationInfoDto>,
    /// Measured distance from the event center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

impl CheckInRejection {
    /// Rejection for an unknown or retired code.
    #[must_use]
    pub fn invalid_code() -> Self {
        Self {
            error: "Invalid or expired QR code".to_string(),
            reason: "invalid_code".to_string(),
            requires_location: None,
            event_location: None,
            distance_meters: None,
        }
    }

    /// Rejection for a missing location fix.
    #[must_use]
    pub fn location_required(location: EventLocation) -> Self {
        Self {
            error: "Location is required to check in to this event".to_string(),
            reason: "location_required".to_string(),
            requires_location: Some(true),
            event_location: Some(location.into()),
            distance_meters: None,
        }
    }

    /// Rejection for a fix outside the fence.
    #[must_use]
    pub fn out_of_range(location: EventLocation, distance_m: f64) -> Self {
        Self {
            error: format!(
                "You are {:.0} m from the event; check-in is allowed within {} m",
                distance_m, location.radius_m
            ),
            reason: "out_of_range".to_string(),
            requires_location: Some(true),
            event_location: Some(location.into()),
            distance_meters: Some(distance_m),
        }
    }
}
