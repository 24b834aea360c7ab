//! Event DTOs: creation, location updates, calendars, QR codes and attendee
//! lists.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{LocationInfoDto, location_policy};
use crate::domain::event::MAX_UPCOMING_DAYS;
use crate::domain::{
    AttendanceRecord, CircleId, Event, EventId, EventWindow, LocationPolicy, NewEvent, UserId,
};
use crate::error::GatewayError;
use crate::service::event_service::EventAttendance;
use crate::service::token_issuer::{CircleCode, EventCode};

/// Request body for `POST /events`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Owning circle.
    pub circle_id: CircleId,
    /// Display title (1-200 characters after trimming).
    pub title: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// Points per check-in.
    #[serde(default)]
    pub points: u32,
    /// Enforce the geofence on check-in.
    #[serde(default)]
    pub requires_location: bool,
    /// Venue latitude.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Venue longitude.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Accepted radius in meters (default 100).
    #[serde(default)]
    pub radius: Option<u32>,
}

impl CreateEventRequest {
    /// Converts into domain input.
    ///
    /// # Errors
    ///
    /// See [`location_policy`].
    pub fn into_new_event(self) -> Result<NewEvent, GatewayError> {
        let policy = location_policy(
            self.requires_location,
            self.latitude,
            self.longitude,
            self.radius,
        )?;
        Ok(NewEvent {
            circle_id: self.circle_id,
            title: self.title,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            points: self.points,
            policy,
        })
    }
}

/// Request body for `PUT /events/{id}/location`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateLocationRequest {
    /// Enforce the geofence on check-in.
    pub requires_location: bool,
    /// Venue latitude.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Venue longitude.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Accepted radius in meters (default 100).
    #[serde(default)]
    pub radius: Option<u32>,
}

impl UpdateLocationRequest {
    /// Converts into a location policy.
    ///
    /// # Errors
    ///
    /// See [`location_policy`].
    pub fn into_policy(self) -> Result<LocationPolicy, GatewayError> {
        location_policy(
            self.requires_location,
            self.latitude,
            self.longitude,
            self.radius,
        )
    }
}

/// Event details.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    /// Event id.
    pub event_id: EventId,
    /// Owning circle.
    pub circle_id: CircleId,
    /// Display title.
    pub title: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end.
    pub ends_at: Option<DateTime<Utc>>,
    /// Points per check-in.
    pub points: u32,
    /// Whether the geofence is enforced.
    pub requires_location: bool,
    /// Registered location, if any.
    pub location_info: Option<LocationInfoDto>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            event_id: event.id,
            circle_id: event.circle_id,
            requires_location: event.policy.requires_location(),
            location_info: event.policy.location().map(LocationInfoDto::from),
            title: event.title,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            points: event.points,
            created_at: event.created_at,
        }
    }
}

/// Body of `GET /events/{id}/qr_code` and its regenerate counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QrCodeResponse {
    /// Event id.
    pub event_id: EventId,
    /// Event title.
    pub event_title: String,
    /// The bare code.
    pub qr_code: String,
    /// The code embedded in a check-in URI; this is what the QR symbol encodes.
    pub qr_code_url: String,
    /// Whether the geofence is enforced.
    pub requires_location: bool,
    /// Registered location, if any.
    pub location_info: Option<LocationInfoDto>,
    /// When the live code was minted.
    pub issued_at: DateTime<Utc>,
}

impl QrCodeResponse {
    /// Builds the response for an event code.
    #[must_use]
    pub fn new(code: EventCode, qr_code_url: String) -> Self {
        Self {
            event_id: code.event.id,
            requires_location: code.event.policy.requires_location(),
            location_info: code.event.policy.location().map(LocationInfoDto::from),
            event_title: code.event.title,
            qr_code: code.token.code.as_str().to_string(),
            qr_code_url,
            issued_at: code.token.issued_at,
        }
    }
}

/// One attendee of an event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendeeDto {
    /// Attendee.
    pub user_id: UserId,
    /// Commit time.
    pub checked_in_at: DateTime<Utc>,
    /// Points awarded.
    pub points_earned: u32,
}

impl From<AttendanceRecord> for AttendeeDto {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            user_id: record.user_id,
            checked_in_at: record.timestamp,
            points_earned: record.points_earned,
        }
    }
}

/// Body of `GET /events/{id}/attendees`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventAttendeesResponse {
    /// Event id.
    pub event_id: EventId,
    /// Event title.
    pub event_title: String,
    /// Number of attendees.
    pub attendee_count: usize,
    /// Attendees, earliest first.
    pub attendees: Vec<AttendeeDto>,
}

impl From<EventAttendance> for EventAttendeesResponse {
    fn from(attendance: EventAttendance) -> Self {
        Self {
            event_id: attendance.event.id,
            event_title: attendance.event.title,
            attendee_count: attendance.attendees.len(),
            attendees: attendance
                .attendees
                .into_iter()
                .map(AttendeeDto::from)
                .collect(),
        }
    }
}

/// One event of a circle's code sheet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CircleQrCodeDto {
    /// Event id.
    pub event_id: EventId,
    /// Event title.
    pub event_title: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Points per check-in.
    pub points: u32,
    /// The bare code.
    pub qr_code: String,
    /// The check-in URI.
    pub qr_code_url: String,
    /// Number of attendees so far.
    pub attendee_count: u64,
    /// Whether the geofence is enforced.
    pub requires_location: bool,
    /// Registered location, if any.
    pub location_info: Option<LocationInfoDto>,
}

impl CircleQrCodeDto {
    /// Builds one code sheet entry.
    #[must_use]
    pub fn new(entry: CircleCode, qr_code_url: String) -> Self {
        let CircleCode {
            code: EventCode { event, token },
            attendee_count,
        } = entry;
        Self {
            event_id: event.id,
            requires_location: event.policy.requires_location(),
            location_info: event.policy.location().map(LocationInfoDto::from),
            event_title: event.title,
            starts_at: event.starts_at,
            points: event.points,
            qr_code: token.code.as_str().to_string(),
            qr_code_url,
            attendee_count,
        }
    }
}

/// Body of `GET /circles/{id}/qr_codes`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CircleQrCodesResponse {
    /// Circle id.
    pub circle_id: CircleId,
    /// Events ordered by start time.
    pub events: Vec<CircleQrCodeDto>,
}

/// `?date=` and `?upcoming_days=` for a circle's calendar.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CalendarQuery {
    /// Only events starting on this UTC day (`YYYY-MM-DD`).
    pub date: Option<String>,
    /// Only events starting from today up to this many days ahead (max 366).
    pub upcoming_days: Option<u32>,
}

impl CalendarQuery {
    /// Converts into a domain window.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a date not in
    /// `YYYY-MM-DD` form or a look-ahead above [`MAX_UPCOMING_DAYS`].
    pub fn into_window(self) -> Result<EventWindow, GatewayError> {
        let date = self
            .date
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                    GatewayError::InvalidRequest(format!(
                        "invalid date {raw:?}, expected YYYY-MM-DD"
                    ))
                })
            })
            .transpose()?;
        if let Some(days) = self.upcoming_days
            && days > MAX_UPCOMING_DAYS
        {
            return Err(GatewayError::InvalidRequest(format!(
                "upcoming_days must not exceed {MAX_UPCOMING_DAYS}"
            )));
        }
        Ok(EventWindow {
            date,
            upcoming_days: self.upcoming_days,
        })
    }
}

/// Body of `GET /circles/{id}/events`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CircleEventsResponse {
    /// Circle id.
    pub circle_id: CircleId,
    /// Events ordered by start time.
    pub events: Vec<EventResponse>,
}

impl CircleEventsResponse {
    /// Builds the calendar body.
    #[must_use]
    pub fn new(circle_id: CircleId, events: Vec<Event>) -> Self {
        Self {
            circle_id,
            events: events.into_iter().map(EventResponse::from).collect(),
        }
    }
}
