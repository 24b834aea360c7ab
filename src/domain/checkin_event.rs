//! Domain events emitted by the check-in subsystem.
//!
//! Every state change publishes a [`CheckInEvent`] through the
//! [`super::EventBus`]; organizers watching an event over WebSocket receive
//! the ones for events they subscribed to. Codes are never included.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::{AttendanceId, EventId, UserId};

/// Domain event emitted after every state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum CheckInEvent {
    /// An attendance row was committed.
    AttendeeCheckedIn {
        /// Event attended.
        event_id: EventId,
        /// Attendee.
        user_id: UserId,
        /// Committed row.
        attendance_id: AttendanceId,
        /// Points awarded.
        points_earned: u32,
        /// Commit time.
        timestamp: DateTime<Utc>,
    },

    /// The first code for an event was issued.
    CodeIssued {
        /// Event the code belongs to.
        event_id: EventId,
        /// Issue time.
        timestamp: DateTime<Utc>,
    },

    /// An event's code was replaced; the previous one no longer resolves.
    CodeRegenerated {
        /// Event the code belongs to.
        event_id: EventId,
        /// Regeneration time.
        timestamp: DateTime<Utc>,
    },

    /// An organizer changed the location requirement of an event.
    LocationPolicyUpdated {
        /// Event updated.
        event_id: EventId,
        /// New requirement flag.
        requires_location: bool,
        /// Update time.
        timestamp: DateTime<Utc>,
    },
}

impl CheckInEvent {
    /// Returns the event id this domain event concerns.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::AttendeeCheckedIn { event_id, .. }
            | Self::CodeIssued { event_id, .. }
            | Self::CodeRegenerated { event_id, .. }
            | Self::LocationPolicyUpdated { event_id, .. } => *event_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::AttendeeCheckedIn { .. } => "attendee_checked_in",
            Self::CodeIssued { .. } => "code_issued",
            Self::CodeRegenerated { .. } => "code_regenerated",
            Self::LocationPolicyUpdated { .. } => "location_policy_updated",
        }
    }
}
