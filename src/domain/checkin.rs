//! Check-in tokens, attempts and the validator's terminal outcomes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::attendance::AttendanceRecord;
use super::checkin_code::CheckInCode;
use super::event::EventLocation;
use super::geofence::Coordinate;
use super::ids::{EventId, UserId};

/// The single live code of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInToken {
    /// Event the code admits to.
    pub event_id: EventId,
    /// Opaque, globally unique code.
    pub code: CheckInCode,
    /// When this code was minted.
    pub issued_at: DateTime<Utc>,
}

impl CheckInToken {
    /// Mints a new token for `event_id`.
    #[must_use]
    pub fn mint(event_id: EventId, entropy_bytes: usize) -> Self {
        Self {
            event_id,
            code: CheckInCode::generate(entropy_bytes),
            issued_at: Utc::now(),
        }
    }
}

/// One presentation of a code by an attendee. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInAttempt {
    /// Extracted code.
    pub code: CheckInCode,
    /// Presenting user.
    pub user_id: UserId,
    /// Location fix, when the device supplied one.
    pub coordinate: Option<Coordinate>,
}

/// Terminal state of a single check-in attempt.
///
/// Every expected business result is a variant here; only infrastructure
/// failures travel as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    /// Attendance committed.
    Success {
        /// The committed row.
        record: AttendanceRecord,
        /// Points awarded, equal to the event's points.
        points_earned: u32,
        /// Title of the event.
        event_title: String,
    },
    /// Unknown, regenerated-away or orphaned code.
    InvalidCode,
    /// The event requires a location fix and none was supplied.
    LocationRequired {
        /// The event's registered location.
        location: EventLocation,
    },
    /// The fix lies outside the event radius.
    OutOfRange {
        /// The event's registered location.
        location: EventLocation,
        /// Measured distance from the event center.
        distance_m: f64,
    },
    /// An attendance row already existed before this attempt.
    AlreadyCheckedIn {
        /// Title of the event.
        event_title: String,
    },
    /// A concurrent attempt committed first; the insert was refused.
    StorageConflict {
        /// Title of the event.
        event_title: String,
    },
}

impl CheckInOutcome {
    /// Snake-case name of the outcome, used in logs and responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::InvalidCode => "invalid_code",
            Self::LocationRequired { .. } => "location_required",
            Self::OutOfRange { .. } => "out_of_range",
            Self::AlreadyCheckedIn { .. } => "already_checked_in",
            Self::StorageConflict { .. } => "storage_conflict",
        }
    }

    /// Whether the caller should be told the attendee is already checked in.
    ///
    /// A lost insert race is indistinguishable from a prior check-in.
    #[must_use]
    pub const fn is_already_checked_in(&self) -> bool {
        matches!(
            self,
            Self::AlreadyCheckedIn { .. } | Self::StorageConflict { .. }
        )
    }

    /// Whether the outcome is a positive confirmation for the attendee.
    #[must_use]
    pub const fn is_confirmation(&self) -> bool {
        matches!(self, Self::Success { .. }) || self.is_already_checked_in()
    }
}
