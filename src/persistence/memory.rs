//! In-memory store for development and tests.
//!
//! [`MemoryStore`] keeps three tables, each behind its own
//! [`tokio::sync::RwLock`]. When an operation needs more than one table the
//! locks are always taken in the order events, tokens, attendance.
//!
//! Nothing survives a restart.

use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{AttendanceStore, EventStore, InsertOutcome, TokenStore, TokenWrite};
use crate::domain::{
    AttendanceId, AttendanceRecord, CheckInCode, CheckInHistoryEntry, CheckInToken, CircleId,
    Event, EventId, LeaderboardEntry, LocationPolicy, NewAttendance, NewEvent, PointsSummary,
    UserId,
};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct EventTable {
    rows: BTreeMap<EventId, Event>,
    last_id: i64,
}

#[derive(Debug, Default)]
struct TokenTable {
    by_event: HashMap<EventId, CheckInToken>,
    by_code: HashMap<CheckInCode, EventId>,
}

impl TokenTable {
    fn put(&mut self, token: &CheckInToken) {
        if let Some(previous) = self.by_event.insert(token.event_id, token.clone()) {
            self.by_code.remove(&previous.code);
        }
        self.by_code.insert(token.code.clone(), token.event_id);
    }
}

#[derive(Debug, Default)]
struct AttendanceTable {
    rows: HashMap<(UserId, EventId), AttendanceRecord>,
    last_id: i64,
}

/// Lock-protected, process-local implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: RwLock<EventTable>,
    tokens: RwLock<TokenTable>,
    attendance: RwLock<AttendanceTable>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn ping(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn create_event(&self, new: NewEvent) -> Result<Event, GatewayError> {
        let mut guard = self.events.write().await;
        let table = &mut *guard;
        table.last_id += 1;
        let event = Event {
            id: EventId::new(table.last_id),
            circle_id: new.circle_id,
            title: new.title,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            points: new.points,
            policy: new.policy,
            created_at: Utc::now(),
        };
        table.rows.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, GatewayError> {
        Ok(self.events.read().await.rows.get(&id).cloned())
    }

    async fn update_policy(
        &self,
        id: EventId,
        policy: LocationPolicy,
    ) -> Result<Option<Event>, GatewayError> {
        let mut table = self.events.write().await;
        Ok(table.rows.get_mut(&id).map(|event| {
            event.policy = policy;
            event.clone()
        }))
    }

    async fn list_circle_events(&self, circle_id: CircleId) -> Result<Vec<Event>, GatewayError> {
        let table = self.events.read().await;
        let mut events: Vec<Event> = table
            .rows
            .values()
            .filter(|e| e.circle_id == circle_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_token(&self, token: &CheckInToken) -> Result<TokenWrite, GatewayError> {
        let events = self.events.read().await;
        if !events.rows.contains_key(&token.event_id) {
            return Err(GatewayError::EventNotFound(token.event_id));
        }
        let mut tokens = self.tokens.write().await;
        if let Some(existing) = tokens.by_event.get(&token.event_id) {
            return Ok(TokenWrite::Existing(existing.clone()));
        }
        if tokens.by_code.contains_key(&token.code) {
            return Ok(TokenWrite::CodeTaken);
        }
        tokens.put(token);
        Ok(TokenWrite::Stored(token.clone()))
    }

    async fn replace_token(&self, token: &CheckInToken) -> Result<TokenWrite, GatewayError> {
        let events = self.events.read().await;
        if !events.rows.contains_key(&token.event_id) {
            return Err(GatewayError::EventNotFound(token.event_id));
        }
        let mut tokens = self.tokens.write().await;
        if tokens.by_code.contains_key(&token.code) {
            return Ok(TokenWrite::CodeTaken);
        }
        tokens.put(token);
        Ok(TokenWrite::Stored(token.clone()))
    }

    async fn token_for_event(&self, id: EventId) -> Result<Option<CheckInToken>, GatewayError> {
        Ok(self.tokens.read().await.by_event.get(&id).cloned())
    }

    async fn resolve_code(&self, code: &CheckInCode) -> Result<Option<EventId>, GatewayError> {
        Ok(self.tokens.read().await.by_code.get(code).copied())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_attendance(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Option<AttendanceRecord>, GatewayError> {
        Ok(self
            .attendance
            .read()
            .await
            .rows
            .get(&(user_id, event_id))
            .cloned())
    }

    async fn try_insert(&self, new: NewAttendance) -> Result<InsertOutcome, GatewayError> {
        let events = self.events.read().await;
        if !events.rows.contains_key(&new.event_id) {
            return Err(GatewayError::EventNotFound(new.event_id));
        }
        let mut guard = self.attendance.write().await;
        let table = &mut *guard;
        let next_id = table.last_id + 1;
        match table.rows.entry((new.user_id, new.event_id)) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                let record = new.into_record(AttendanceId::new(next_id));
                slot.insert(record.clone());
                table.last_id = next_id;
                Ok(InsertOutcome::Inserted(record))
            }
        }
    }

    async fn event_attendance(
        &self,
        event_id: EventId,
    ) -> Result<Vec<AttendanceRecord>, GatewayError> {
        let table = self.attendance.read().await;
        let mut rows: Vec<AttendanceRecord> = table
            .rows
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.timestamp, r.id));
        Ok(rows)
    }

    async fn attendee_count(&self, event_id: EventId) -> Result<u64, GatewayError> {
        let table = self.attendance.read().await;
        let count = table
            .rows
            .values()
            .filter(|r| r.event_id == event_id)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn user_history(
        &self,
        user_id: UserId,
        circle_id: Option<CircleId>,
    ) -> Result<Vec<CheckInHistoryEntry>, GatewayError> {
        let events = self.events.read().await;
        let table = self.attendance.read().await;
        let mut history: Vec<CheckInHistoryEntry> = table
            .rows
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                let event = events.rows.get(&r.event_id)?;
                if let Some(circle) = circle_id
                    && event.circle_id != circle
                {
                    return None;
                }
                Some(CheckInHistoryEntry {
                    id: r.id,
                    event_id: r.event_id,
                    event_title: event.title.clone(),
                    circle_id: event.circle_id,
                    points_earned: r.points_earned,
                    checked_in_at: r.timestamp,
                })
            })
            .collect();
        history.sort_by(|a, b| b.checked_in_at.cmp(&a.checked_in_at).then(b.id.cmp(&a.id)));
        Ok(history)
    }

    async fn user_points(
        &self,
        user_id: UserId,
        circle_id: Option<CircleId>,
    ) -> Result<PointsSummary, GatewayError> {
        let history = self.user_history(user_id, circle_id).await?;
        Ok(PointsSummary {
            user_id,
            circle_id,
            total_points: history.iter().map(|h| u64::from(h.points_earned)).sum(),
            checkin_count: u64::try_from(history.len()).unwrap_or(u64::MAX),
        })
    }

    async fn leaderboard(
        &self,
        circle_id: CircleId,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, GatewayError> {
        let events = self.events.read().await;
        let table = self.attendance.read().await;
        let mut totals: BTreeMap<UserId, LeaderboardEntry> = BTreeMap::new();
        for record in table.rows.values() {
            let in_circle = events
                .rows
                .get(&record.event_id)
                .is_some_and(|e| e.circle_id == circle_id);
            if !in_circle {
                continue;
            }
            let entry = totals.entry(record.user_id).or_insert(LeaderboardEntry {
                user_id: record.user_id,
                total_points: 0,
                checkin_count: 0,
            });
            entry.total_points += u64::from(record.points_earned);
            entry.checkin_count += 1;
        }
        let mut ranked: Vec<LeaderboardEntry> = totals.into_values().collect();
        ranked.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then(a.user_id.cmp(&b.user_id))
        });
        ranked.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(ranked)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
pub(crate) mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::domain::CheckInMethod;

    /// A [`MemoryStore`] whose `find_attendance` never sees existing rows,
    /// as if the read ran before a concurrent insert committed. Only
    /// `try_insert` can then reject a second check-in.
    #[derive(Debug, Default)]
    pub(crate) struct StaleReadStore {
        pub(crate) inner: MemoryStore,
    }

    #[async_trait]
    impl EventStore for StaleReadStore {
        async fn ping(&self) -> Result<(), GatewayError> {
            self.inner.ping().await
        }

        async fn create_event(&self, new: NewEvent) -> Result<Event, GatewayError> {
            self.inner.create_event(new).await
        }

        async fn get_event(&self, id: EventId) -> Result<Option<Event>, GatewayError> {
            self.inner.get_event(id).await
        }

        async fn update_policy(
            &self,
            id: EventId,
            policy: LocationPolicy,
        ) -> Result<Option<Event>, GatewayError> {
            self.inner.update_policy(id, policy).await
        }

        async fn list_circle_events(
            &self,
            circle_id: CircleId,
        ) -> Result<Vec<Event>, GatewayError> {
            self.inner.list_circle_events(circle_id).await
        }
    }

    #[async_trait]
    impl TokenStore for StaleReadStore {
        async fn insert_token(&self, token: &CheckInToken) -> Result<TokenWrite, GatewayError> {
            self.inner.insert_token(token).await
        }

        async fn replace_token(&self, token: &CheckInToken) -> Result<TokenWrite, GatewayError> {
            self.inner.replace_token(token).await
        }

        async fn token_for_event(
            &self,
            id: EventId,
        ) -> Result<Option<CheckInToken>, GatewayError> {
            self.inner.token_for_event(id).await
        }

        async fn resolve_code(&self, code: &CheckInCode) -> Result<Option<EventId>, GatewayError> {
            self.inner.resolve_code(code).await
        }
    }

    #[async_trait]
    impl AttendanceStore for StaleReadStore {
        async fn find_attendance(
            &self,
            _user_id: UserId,
            _event_id: EventId,
        ) -> Result<Option<AttendanceRecord>, GatewayError> {
            Ok(None)
        }

        async fn try_insert(&self, new: NewAttendance) -> Result<InsertOutcome, GatewayError> {
            self.inner.try_insert(new).await
        }

        async fn event_attendance(
            &self,
            event_id: EventId,
        ) -> Result<Vec<AttendanceRecord>, GatewayError> {
            self.inner.event_attendance(event_id).await
        }

        async fn attendee_count(&self, event_id: EventId) -> Result<u64, GatewayError> {
            self.inner.attendee_count(event_id).await
        }

        async fn user_history(
            &self,
            user_id: UserId,
            circle_id: Option<CircleId>,
        ) -> Result<Vec<CheckInHistoryEntry>, GatewayError> {
            self.inner.user_history(user_id, circle_id).await
        }

        async fn user_points(
            &self,
            user_id: UserId,
            circle_id: Option<CircleId>,
        ) -> Result<PointsSummary, GatewayError> {
            self.inner.user_points(user_id, circle_id).await
        }

        async fn leaderboard(
            &self,
            circle_id: CircleId,
            limit: u32,
        ) -> Result<Vec<LeaderboardEntry>, GatewayError> {
            self.inner.leaderboard(circle_id, limit).await
        }
    }

    fn new_event(circle: i64, title: &str, points: u32) -> NewEvent {
        NewEvent {
            circle_id: CircleId::new(circle),
            title: title.to_string(),
            starts_at: Utc::now(),
            ends_at: None,
            points,
            policy: LocationPolicy::open(),
        }
    }

    fn attendance(user: i64, event: &Event) -> NewAttendance {
        NewAttendance {
            user_id: UserId::new(user),
            event_id: event.id,
            timestamp: Utc::now(),
            method: CheckInMethod::Qr,
            points_earned: event.points,
        }
    }

    async fn seeded_event(store: &MemoryStore, points: u32) -> Event {
        let Ok(event) = store.create_event(new_event(1, "Meetup", points)).await else {
            panic!("create failed");
        };
        event
    }

    #[tokio::test]
    async fn event_ids_are_sequential() {
        let store = MemoryStore::new();
        let first = seeded_event(&store, 10).await;
        let second = seeded_event(&store, 10).await;
        assert_eq!(first.id, EventId::new(1));
        assert_eq!(second.id, EventId::new(2));

        let Ok(Some(loaded)) = store.get_event(first.id).await else {
            panic!("event missing");
        };
        assert_eq!(loaded, first);
    }

    #[tokio::test]
    async fn update_policy_on_missing_event_returns_none() {
        let store = MemoryStore::new();
        let Ok(updated) = store
            .update_policy(EventId::new(99), LocationPolicy::open())
            .await
        else {
            panic!("update failed");
        };
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn insert_token_is_idempotent_per_event() {
        let store = MemoryStore::new();
        let event = seeded_event(&store, 10).await;
        let first = CheckInToken::mint(event.id, 24);
        let second = CheckInToken::mint(event.id, 24);

        let Ok(TokenWrite::Stored(stored)) = store.insert_token(&first).await else {
            panic!("first insert should store");
        };
        let Ok(TokenWrite::Existing(existing)) = store.insert_token(&second).await else {
            panic!("second insert should return existing");
        };
        assert_eq!(stored, existing);
    }

    #[tokio::test]
    async fn duplicate_code_is_reported_as_taken() {
        let store = MemoryStore::new();
        let a = seeded_event(&store, 10).await;
        let b = seeded_event(&store, 10).await;
        let token = CheckInToken::mint(a.id, 24);
        let Ok(TokenWrite::Stored(_)) = store.insert_token(&token).await else {
            panic!("insert failed");
        };
        let clash = CheckInToken {
            event_id: b.id,
            code: token.code.clone(),
            issued_at: Utc::now(),
        };
        assert_eq!(store.insert_token(&clash).await.ok(), Some(TokenWrite::CodeTaken));
    }

    #[tokio::test]
    async fn replace_token_retires_previous_code() {
        let store = MemoryStore::new();
        let event = seeded_event(&store, 10).await;
        let old = CheckInToken::mint(event.id, 24);
        let new = CheckInToken::mint(event.id, 24);
        let Ok(TokenWrite::Stored(_)) = store.insert_token(&old).await else {
            panic!("insert failed");
        };
        let Ok(TokenWrite::Stored(_)) = store.replace_token(&new).await else {
            panic!("replace failed");
        };

        assert_eq!(store.resolve_code(&old.code).await.ok(), Some(None));
        assert_eq!(
            store.resolve_code(&new.code).await.ok(),
            Some(Some(event.id))
        );
        let Ok(Some(live)) = store.token_for_event(event.id).await else {
            panic!("token missing");
        };
        assert_eq!(live.code, new.code);
    }

    #[tokio::test]
    async fn token_for_unknown_event_is_refused() {
        let store = MemoryStore::new();
        let token = CheckInToken::mint(EventId::new(5), 24);
        let Err(GatewayError::EventNotFound(id)) = store.insert_token(&token).await else {
            panic!("expected EventNotFound");
        };
        assert_eq!(id, EventId::new(5));
    }

    #[tokio::test]
    async fn second_insert_for_same_pair_already_exists() {
        let store = MemoryStore::new();
        let event = seeded_event(&store, 15).await;
        let Ok(InsertOutcome::Inserted(record)) = store.try_insert(attendance(7, &event)).await
        else {
            panic!("first insert should commit");
        };
        assert_eq!(record.points_earned, 15);
        assert_eq!(
            store.try_insert(attendance(7, &event)).await.ok(),
            Some(InsertOutcome::AlreadyExists)
        );
        assert_eq!(store.attendee_count(event.id).await.ok(), Some(1));
    }

    #[tokio::test]
    async fn concurrent_inserts_commit_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let event = seeded_event(&store, 10).await;

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            let new = attendance(1, &event);
            handles.push(tokio::spawn(async move { store.try_insert(new).await }));
        }

        let mut inserted = 0;
        for handle in handles {
            let Ok(Ok(outcome)) = handle.await else {
                panic!("task failed");
            };
            if matches!(outcome, InsertOutcome::Inserted(_)) {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.attendee_count(event.id).await.ok(), Some(1));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_filtered_by_circle() {
        let store = MemoryStore::new();
        let Ok(early) = store.create_event(new_event(1, "Early", 5)).await else {
            panic!("create failed");
        };
        let Ok(late) = store.create_event(new_event(2, "Late", 8)).await else {
            panic!("create failed");
        };

        let mut first = attendance(3, &early);
        first.timestamp = Utc::now() - Duration::hours(2);
        let Ok(InsertOutcome::Inserted(_)) = store.try_insert(first).await else {
            panic!("insert failed");
        };
        let Ok(InsertOutcome::Inserted(_)) = store.try_insert(attendance(3, &late)).await else {
            panic!("insert failed");
        };

        let Ok(all) = store.user_history(UserId::new(3), None).await else {
            panic!("history failed");
        };
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event_title, "Late");
        assert_eq!(all[1].event_title, "Early");

        let Ok(scoped) = store
            .user_history(UserId::new(3), Some(CircleId::new(1)))
            .await
        else {
            panic!("history failed");
        };
        assert_eq!(scoped.len(), 1);

        let Ok(points) = store.user_points(UserId::new(3), None).await else {
            panic!("points failed");
        };
        assert_eq!(points.total_points, 13);
        assert_eq!(points.checkin_count, 2);
    }

    #[tokio::test]
    async fn leaderboard_ranks_by_points_then_user() {
        let store = MemoryStore::new();
        let big = seeded_event(&store, 20).await;
        let small = seeded_event(&store, 5).await;

        for (user, event) in [(1, &small), (2, &big), (3, &big), (3, &small)] {
            let Ok(InsertOutcome::Inserted(_)) = store.try_insert(attendance(user, event)).await
            else {
                panic!("insert failed");
            };
        }

        let Ok(board) = store.leaderboard(CircleId::new(1), 10).await else {
            panic!("leaderboard failed");
        };
        let order: Vec<i64> = board.iter().map(|e| e.user_id.get()).collect();
        assert_eq!(order, vec![3, 2, 1]);
        assert_eq!(board[0].total_points, 25);
        assert_eq!(board[0].checkin_count, 2);

        let Ok(top) = store.leaderboard(CircleId::new(1), 1).await else {
            panic!("leaderboard failed");
        };
        assert_eq!(top.len(), 1);
    }
}
