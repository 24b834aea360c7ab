//! Scheduled events and their check-in location policy.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use super::geofence::{Coordinate, CoordinateError, Geofence};
use super::ids::{CircleId, EventId};

/// Radius applied when an organizer enables location without choosing one.
pub const DEFAULT_RADIUS_M: u32 = 100;

/// Largest accepted geofence radius.
pub const MAX_RADIUS_M: u32 = 1_000_000;

/// Largest reward a single check-in may carry.
pub const MAX_EVENT_POINTS: u32 = 100_000;

/// Longest look-ahead accepted for upcoming events.
pub const MAX_UPCOMING_DAYS: u32 = 366;

/// Registered location of an event plus the accepted radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventLocation {
    /// Center of the venue.
    pub center: Coordinate,
    /// Accepted distance from the center, in whole meters.
    pub radius_m: u32,
}

impl EventLocation {
    /// Builds a location, validating coordinate and radius.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] for out-of-range coordinates or a radius
    /// of zero or above [`MAX_RADIUS_M`].
    pub fn new(latitude: f64, longitude: f64, radius_m: u32) -> Result<Self, CoordinateError> {
        let center = Coordinate::new(latitude, longitude)?;
        if radius_m == 0 || radius_m > MAX_RADIUS_M {
            return Err(CoordinateError::Radius(f64::from(radius_m)));
        }
        Ok(Self { center, radius_m })
    }

    /// The circular fence described by this location.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::Radius`] if the radius is zero.
    pub fn geofence(&self) -> Result<Geofence, CoordinateError> {
        Geofence::new(self.center, f64::from(self.radius_m))
    }
}

/// Whether check-in requires presence, and where.
///
/// Constructed only through [`LocationPolicy::new`], which refuses a
/// requirement without a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationPolicy {
    requires_location: bool,
    location: Option<EventLocation>,
}

/// A location requirement was requested without a location to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("an event that requires location must have a registered location")]
pub struct MissingLocation;

impl LocationPolicy {
    /// Builds a policy.
    ///
    /// # Errors
    ///
    /// Returns [`MissingLocation`] if `requires_location` is set but no
    /// location is given.
    pub fn new(
        requires_location: bool,
        location: Option<EventLocation>,
    ) -> Result<Self, MissingLocation> {
        if requires_location && location.is_none() {
            return Err(MissingLocation);
        }
        Ok(Self {
            requires_location,
            location,
        })
    }

    /// A policy with no location at all.
    #[must_use]
    pub const fn open() -> Self {
        Self {
            requires_location: false,
            location: None,
        }
    }

    /// Whether attendees must be inside the fence.
    #[must_use]
    pub const fn requires_location(&self) -> bool {
        self.requires_location
    }

    /// The registered location, if any.
    #[must_use]
    pub const fn location(&self) -> Option<EventLocation> {
        self.location
    }

    /// The location to enforce, present only when location is required.
    #[must_use]
    pub fn enforced_location(&self) -> Option<EventLocation> {
        self.location.filter(|_| self.requires_location)
    }
}

/// A scheduled event owned by a circle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Event identity.
    pub id: EventId,
    /// Owning circle.
    pub circle_id: CircleId,
    /// Display title.
    pub title: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end, when known.
    pub ends_at: Option<DateTime<Utc>>,
    /// Points awarded per check-in.
    pub points: u32,
    /// Location requirement.
    pub policy: LocationPolicy,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Calendar filter over event start dates, in UTC.
///
/// Both bounds apply when both are set. The default window matches every
/// event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventWindow {
    /// Only events starting on this day.
    pub date: Option<NaiveDate>,
    /// Only events starting between today and this many days ahead,
    /// inclusive.
    pub upcoming_days: Option<u32>,
}

impl EventWindow {
    /// Whether `event` falls in the window as seen on `today`.
    #[must_use]
    pub fn contains(&self, event: &Event, today: NaiveDate) -> bool {
        let day = event.starts_at.date_naive();
        if let Some(date) = self.date
            && day != date
        {
            return false;
        }
        if let Some(days) = self.upcoming_days {
            let last = today
                .checked_add_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MAX);
            if day < today || day > last {
                return false;
            }
        }
        true
    }
}

/// Validated input for creating an event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    /// Owning circle.
    pub circle_id: CircleId,
    /// Display title, non-empty and at most 200 characters.
    pub title: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end; must not precede the start.
    pub ends_at: Option<DateTime<Utc>>,
    /// Points awarded per check-in, at most [`MAX_EVENT_POINTS`].
    pub points: u32,
    /// Location requirement.
    pub policy: LocationPolicy,
}

/// Rejected event input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventValidationError {
    /// Title empty or too long.
    #[error("title must be 1-200 characters")]
    Title,
    /// End precedes start.
    #[error("event cannot end before it starts")]
    Schedule,
    /// Reward above [`MAX_EVENT_POINTS`].
    #[error("points must not exceed {MAX_EVENT_POINTS}")]
    Points,
}

impl NewEvent {
    /// Checks title and schedule.
    ///
    /// # Errors
    ///
    /// Returns [`EventValidationError`] describing the first problem found.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        let title_len = self.title.trim().chars().count();
        if title_len == 0 || title_len > 200 {
            return Err(EventValidationError::Title);
        }
        if let Some(end) = self.ends_at
            && end < self.starts_at
        {
            return Err(EventValidationError::Schedule);
        }
        if self.points > MAX_EVENT_POINTS {
            return Err(EventValidationError::Points);
        }
        Ok(())
    }
}
