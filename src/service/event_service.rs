//! Event service: organizer operations and attendee queries.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    AttendanceRecord, CheckInEvent, CheckInHistoryEntry, CircleId, Event, EventBus, EventId,
    EventWindow, LeaderboardEntry, LocationPolicy, NewEvent, PointsSummary, UserId,
};
use crate::error::GatewayError;
use crate::persistence::{AttendanceStore, CheckInStore, EventStore};

/// Leaderboard size when the caller does not ask for one.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Largest leaderboard a caller may request.
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// An event with its attendance rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EventAttendance {
    /// The event.
    pub event: Event,
    /// Attendance rows, oldest first.
    pub attendees: Vec<AttendanceRecord>,
}

/// Creates and updates events and answers read-only attendance queries.
#[derive(Debug, Clone)]
pub struct EventService {
    store: Arc<dyn CheckInStore>,
    event_bus: EventBus,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(store: Arc<dyn CheckInStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns the store's error when it is not.
    pub async fn ping(&self) -> Result<(), GatewayError> {
        self.store.ping().await
    }

    /// Validates and stores a new event. The title is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for invalid input, or a
    /// storage error.
    pub async fn create_event(&self, mut new: NewEvent) -> Result<Event, GatewayError> {
        new.title = new.title.trim().to_string();
        new.validate()?;
        let event = self.store.create_event(new).await?;
        tracing::info!(
            event_id = %event.id,
            circle_id = %event.circle_id,
            requires_location = event.policy.requires_location(),
            "event created"
        );
        Ok(event)
    }

    /// Loads an event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if it does not exist.
    pub async fn get_event(&self, id: EventId) -> Result<Event, GatewayError> {
        self.store
            .get_event(id)
            .await?
            .ok_or(GatewayError::EventNotFound(id))
    }

    /// Replaces an event's location policy.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if it does not exist, or a
    /// storage error.
    pub async fn update_location(
        &self,
        id: EventId,
        policy: LocationPolicy,
    ) -> Result<Event, GatewayError> {
        let event = self
            .store
            .update_policy(id, policy)
            .await?
            .ok_or(GatewayError::EventNotFound(id))?;

        let _ = self.event_bus.publish(CheckInEvent::LocationPolicyUpdated {
            event_id: id,
            requires_location: policy.requires_location(),
            timestamp: Utc::now(),
        });
        tracing::info!(
            event_id = %id,
            requires_location = policy.requires_location(),
            "location policy updated"
        );
        Ok(event)
    }

    /// A circle's calendar: its events in `window`, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn circle_events(
        &self,
        circle_id: CircleId,
        window: EventWindow,
    ) -> Result<Vec<Event>, GatewayError> {
        let today = Utc::now().date_naive();
        let mut events = self.store.list_circle_events(circle_id).await?;
        events.retain(|event| window.contains(event, today));
        Ok(events)
    }

    /// Lists who checked into an event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if it does not exist, or a
    /// storage error.
    pub async fn attendees(&self, id: EventId) -> Result<EventAttendance, GatewayError> {
        let event = self.get_event(id).await?;
        let attendees = self.store.event_attendance(id).await?;
        Ok(EventAttendance { event, attendees })
    }

    /// A user's check-ins, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn user_history(
        &self,
        user_id: UserId,
        circle_id: Option<CircleId>,
    ) -> Result<Vec<CheckInHistoryEntry>, GatewayError> {
        self.store.user_history(user_id, circle_id).await
    }

    /// A user's point total.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn user_points(
        &self,
        user_id: UserId,
        circle_id: Option<CircleId>,
    ) -> Result<PointsSummary, GatewayError> {
        self.store.user_points(user_id, circle_id).await
    }

    /// Ranks a circle's members by points. `limit` defaults to
    /// [`DEFAULT_LEADERBOARD_LIMIT`] and is clamped to
    /// `1..=`[`MAX_LEADERBOARD_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn leaderboard(
        &self,
        circle_id: CircleId,
        limit: Option<u32>,
    ) -> Result<Vec<LeaderboardEntry>, GatewayError> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT);
        self.store.leaderboard(circle_id, limit).await
    }
}
