//! Persistence layer: events, check-in tokens and attendance.
//!
//! The storage contract is split into three traits, combined by
//! [`CheckInStore`]. Two backends implement all of them:
//!
//! - [`postgres::PostgresStore`], `sqlx::PgPool` over the schema in
//!   `migrations/`;
//! - [`memory::MemoryStore`], lock-protected maps for development and tests.
//!
//! The one operation every correctness argument rests on is
//! [`AttendanceStore::try_insert`]: it must be a single atomic
//! insert-if-absent on `(user_id, event_id)`.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{
    AttendanceRecord, CheckInCode, CheckInHistoryEntry, CheckInToken, CircleId, Event, EventId,
    LeaderboardEntry, LocationPolicy, NewAttendance, NewEvent, PointsSummary, UserId,
};
use crate::error::GatewayError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Result of writing a check-in token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenWrite {
    /// The token was stored and is now the event's live code.
    Stored(CheckInToken),
    /// The event already had a token; it is returned unchanged.
    Existing(CheckInToken),
    /// The code is already used by another event. Mint a new one.
    CodeTaken,
}

/// Result of [`AttendanceStore::try_insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The row was committed.
    Inserted(AttendanceRecord),
    /// A row for the same `(user_id, event_id)` already exists.
    AlreadyExists,
}

/// Event storage.
#[async_trait]
pub trait EventStore: Send + Sync + fmt::Debug {
    /// Checks that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] when it is not.
    async fn ping(&self) -> Result<(), GatewayError>;

    /// Stores a new event and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn create_event(&self, new: NewEvent) -> Result<Event, GatewayError>;

    /// Loads an event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, GatewayError>;

    /// Replaces an event's location policy, returning the updated event or
    /// `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn update_policy(
        &self,
        id: EventId,
        policy: LocationPolicy,
    ) -> Result<Option<Event>, GatewayError>;

    /// Lists a circle's events ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn list_circle_events(&self, circle_id: CircleId) -> Result<Vec<Event>, GatewayError>;
}

/// Check-in token storage. At most one token per event; codes are
/// globally unique.
#[async_trait]
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Stores `token` unless its event already has one.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist,
    /// [`GatewayError::PersistenceError`] on storage failure.
    async fn insert_token(&self, token: &CheckInToken) -> Result<TokenWrite, GatewayError>;

    /// Atomically makes `token` the event's only code. The previous code
    /// stops resolving in the same operation.
    ///
    /// Never returns [`TokenWrite::Existing`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist,
    /// [`GatewayError::PersistenceError`] on storage failure.
    async fn replace_token(&self, token: &CheckInToken) -> Result<TokenWrite, GatewayError>;

    /// Returns the live token of an event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn token_for_event(&self, id: EventId) -> Result<Option<CheckInToken>, GatewayError>;

    /// Resolves a live code to its event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn resolve_code(&self, code: &CheckInCode) -> Result<Option<EventId>, GatewayError>;
}

/// Uniqueness-constrained attendance storage.
#[async_trait]
pub trait AttendanceStore: Send + Sync + fmt::Debug {
    /// Looks up the attendance row of a user at an event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn find_attendance(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Option<AttendanceRecord>, GatewayError>;

    /// Inserts `new` if no row exists for its `(user_id, event_id)`, as one
    /// atomic operation. A uniqueness violation is reported as
    /// [`InsertOutcome::AlreadyExists`], never as an error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on any other failure.
    async fn try_insert(&self, new: NewAttendance) -> Result<InsertOutcome, GatewayError>;

    /// Lists the attendance rows of an event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn event_attendance(&self, event_id: EventId)
    -> Result<Vec<AttendanceRecord>, GatewayError>;

    /// Counts the attendance rows of an event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn attendee_count(&self, event_id: EventId) -> Result<u64, GatewayError>;

    /// Lists a user's check-ins, newest first, optionally within a circle.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn user_history(
        &self,
        user_id: UserId,
        circle_id: Option<CircleId>,
    ) -> Result<Vec<CheckInHistoryEntry>, GatewayError>;

    /// Sums a user's points, optionally within a circle.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn user_points(
        &self,
        user_id: UserId,
        circle_id: Option<CircleId>,
    ) -> Result<PointsSummary, GatewayError>;

    /// Ranks users of a circle by points earned, highest first, ties broken
    /// by user id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn leaderboard(
        &self,
        circle_id: CircleId,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, GatewayError>;
}

/// The full storage contract of the gateway.
pub trait CheckInStore: EventStore + TokenStore + AttendanceStore {}

impl<T> CheckInStore for T where T: EventStore + TokenStore + AttendanceStore + ?Sized {}
