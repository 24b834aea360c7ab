//! Database rows for events, tokens and attendance, and their conversion
//! into domain types.
//!
//! Integer columns are `INTEGER` in PostgreSQL, so `u32` domain values are
//! stored as `i32` and checked on the way back.

use chrono::{DateTime, Utc};

use crate::domain::{
    AttendanceId, AttendanceRecord, CheckInCode, CheckInHistoryEntry, CheckInMethod, CheckInToken,
    CircleId, Event, EventId, EventLocation, LocationPolicy, UserId,
};
use crate::error::GatewayError;

/// Column list matching [`StoredEvent`], in tuple order.
pub const EVENT_COLUMNS: &str = "id, circle_id, title, starts_at, ends_at, points, \
     requires_location, latitude, longitude, radius_m, created_at";

/// Column list matching [`StoredAttendance`], in tuple order.
pub const ATTENDANCE_COLUMNS: &str =
    "id, user_id, event_id, checked_in_at, method, points_earned";

/// Tuple shape of an `events` row.
pub type EventRow = (
    i64,
    i64,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    i32,
    bool,
    Option<f64>,
    Option<f64>,
    Option<i32>,
    DateTime<Utc>,
);

/// Tuple shape of an `attendance` row.
pub type AttendanceRow = (i64, i64, i64, DateTime<Utc>, String, i32);

/// Tuple shape of a history row: attendance joined with its event.
pub type HistoryRow = (i64, i64, String, i64, i32, DateTime<Utc>);

/// A row from the `events` table.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Auto-increment row ID.
    pub id: i64,
    /// Owning circle.
    pub circle_id: i64,
    /// Display title.
    pub title: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end.
    pub ends_at: Option<DateTime<Utc>>,
    /// Points per check-in.
    pub points: i32,
    /// Whether the geofence is enforced.
    pub requires_location: bool,
    /// Venue latitude.
    pub latitude: Option<f64>,
    /// Venue longitude.
    pub longitude: Option<f64>,
    /// Accepted radius in meters.
    pub radius_m: Option<i32>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        let (
            id,
            circle_id,
            title,
            starts_at,
            ends_at,
            points,
            requires_location,
            latitude,
            longitude,
            radius_m,
            created_at,
        ) = row;
        Self {
            id,
            circle_id,
            title,
            starts_at,
            ends_at,
            points,
            requires_location,
            latitude,
            longitude,
            radius_m,
            created_at,
        }
    }
}

impl TryFrom<StoredEvent> for Event {
    type Error = GatewayError;

    fn try_from(row: StoredEvent) -> Result<Self, Self::Error> {
        let location = match (row.latitude, row.longitude, row.radius_m) {
            (Some(lat), Some(lon), Some(radius)) => Some(
                EventLocation::new(lat, lon, to_u32(radius, "radius_m")?)
                    .map_err(|e| corrupt(row.id, &e))?,
            ),
            _ => None,
        };
        let policy =
            LocationPolicy::new(row.requires_location, location).map_err(|e| corrupt(row.id, &e))?;
        Ok(Self {
            id: EventId::new(row.id),
            circle_id: CircleId::new(row.circle_id),
            title: row.title,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            points: to_u32(row.points, "points")?,
            policy,
            created_at: row.created_at,
        })
    }
}

/// Column values of a location policy:
/// `(requires_location, latitude, longitude, radius_m)`.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] if the radius does not fit a column.
pub fn policy_columns(
    policy: &LocationPolicy,
) -> Result<(bool, Option<f64>, Option<f64>, Option<i32>), GatewayError> {
    let Some(location) = policy.location() else {
        return Ok((policy.requires_location(), None, None, None));
    };
    Ok((
        policy.requires_location(),
        Some(location.center.latitude()),
        Some(location.center.longitude()),
        Some(to_i32(location.radius_m)?),
    ))
}

/// A row from the `attendance` table.
#[derive(Debug, Clone)]
pub struct StoredAttendance {
    /// Auto-increment row ID.
    pub id: i64,
    /// Attendee.
    pub user_id: i64,
    /// Event attended.
    pub event_id: i64,
    /// Commit time.
    pub checked_in_at: DateTime<Utc>,
    /// Proof method (`"qr"` or `"manual"`).
    pub method: String,
    /// Points awarded.
    pub points_earned: i32,
}

impl From<AttendanceRow> for StoredAttendance {
    fn from((id, user_id, event_id, checked_in_at, method, points_earned): AttendanceRow) -> Self {
        Self {
            id,
            user_id,
            event_id,
            checked_in_at,
            method,
            points_earned,
        }
    }
}

impl TryFrom<StoredAttendance> for AttendanceRecord {
    type Error = GatewayError;

    fn try_from(row: StoredAttendance) -> Result<Self, Self::Error> {
        let method = CheckInMethod::parse(&row.method).ok_or_else(|| {
            GatewayError::PersistenceError(format!(
                "attendance {} has unknown method {:?}",
                row.id, row.method
            ))
        })?;
        Ok(Self {
            id: AttendanceId::new(row.id),
            user_id: UserId::new(row.user_id),
            event_id: EventId::new(row.event_id),
            timestamp: row.checked_in_at,
            method,
            points_earned: to_u32(row.points_earned, "points_earned")?,
        })
    }
}

/// Converts a joined history row.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] on a negative point value.
pub fn history_entry(
    (id, event_id, event_title, circle_id, points_earned, checked_in_at): HistoryRow,
) -> Result<CheckInHistoryEntry, GatewayError> {
    Ok(CheckInHistoryEntry {
        id: AttendanceId::new(id),
        event_id: EventId::new(event_id),
        event_title,
        circle_id: CircleId::new(circle_id),
        points_earned: to_u32(points_earned, "points_earned")?,
        checked_in_at,
    })
}

/// Converts a `checkin_tokens` row.
#[must_use]
pub fn token((event_id, code, issued_at): (i64, String, DateTime<Utc>)) -> CheckInToken {
    CheckInToken {
        event_id: EventId::new(event_id),
        code: CheckInCode::from_stored(code),
        issued_at,
    }
}

/// Reads a non-negative `BIGINT` aggregate.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the value is negative.
pub fn to_u64(value: i64, column: &str) -> Result<u64, GatewayError> {
    u64::try_from(value)
        .map_err(|_| GatewayError::PersistenceError(format!("negative {column}: {value}")))
}

/// Converts a domain count or reward into an `INTEGER` column value.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] if the value exceeds `i32::MAX`.
pub fn to_i32(value: u32) -> Result<i32, GatewayError> {
    i32::try_from(value).map_err(|_| GatewayError::Internal(format!("{value} exceeds INTEGER")))
}

fn to_u32(value: i32, column: &str) -> Result<u32, GatewayError> {
    u32::try_from(value)
        .map_err(|_| GatewayError::PersistenceError(format!("negative {column}: {value}")))
}

fn corrupt(id: i64, err: &dyn std::fmt::Display) -> GatewayError {
    GatewayError::PersistenceError(format!("event {id} has an invalid location: {err}"))
}
