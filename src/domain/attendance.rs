//! Attendance records and the read models built from them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::{AttendanceId, CircleId, EventId, UserId};

/// How an attendee proved presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInMethod {
    /// Scanned the event QR code.
    Qr,
    /// Marked present by an organizer.
    Manual,
}

impl CheckInMethod {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qr => "qr",
            Self::Manual => "manual",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "qr" => Some(Self::Qr),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// A committed check-in. At most one exists per `(user_id, event_id)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    /// Row identity.
    pub id: AttendanceId,
    /// Attendee.
    pub user_id: UserId,
    /// Event attended.
    pub event_id: EventId,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Proof method.
    pub method: CheckInMethod,
    /// Points awarded.
    pub points_earned: u32,
}

/// An attendance row that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    /// Attendee.
    pub user_id: UserId,
    /// Event attended.
    pub event_id: EventId,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Proof method.
    pub method: CheckInMethod,
    /// Points awarded.
    pub points_earned: u32,
}

impl NewAttendance {
    /// Attaches the identity assigned by the store.
    #[must_use]
    pub fn into_record(self, id: AttendanceId) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: self.user_id,
            event_id: self.event_id,
            timestamp: self.timestamp,
            method: self.method,
            points_earned: self.points_earned,
        }
    }
}

/// One row of a user's check-in history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckInHistoryEntry {
    /// Attendance row.
    pub id: AttendanceId,
    /// Event attended.
    pub event_id: EventId,
    /// Event title at query time.
    pub event_title: String,
    /// Circle owning the event.
    pub circle_id: CircleId,
    /// Points awarded.
    pub points_earned: u32,
    /// Commit time.
    pub checked_in_at: DateTime<Utc>,
}

/// Aggregate points for one user, optionally scoped to a circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsSummary {
    /// Attendee.
    pub user_id: UserId,
    /// Circle scope, if any.
    pub circle_id: Option<CircleId>,
    /// Sum of points earned.
    pub total_points: u64,
    /// Number of check-ins.
    pub checkin_count: u64,
}

/// One leaderboard position inside a circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// Attendee.
    pub user_id: UserId,
    /// Sum of points earned in the circle.
    pub total_points: u64,
    /// Number of check-ins in the circle.
    pub checkin_count: u64,
}
