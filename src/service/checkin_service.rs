//! Check-in validator.
//!
//! [`CheckInService::check_in`] runs one attempt through
//! `CodeLookup -> LocationGate -> DuplicateGate -> Commit` and returns a
//! [`CheckInOutcome`]. It keeps no state of its own; concurrent attempts
//! are serialized only by the store's insert-if-absent.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    CheckInAttempt, CheckInEvent, CheckInMethod, CheckInOutcome, Event, EventBus, EventId,
    NewAttendance, UserId,
};
use crate::error::GatewayError;
use crate::persistence::{AttendanceStore, CheckInStore, EventStore, InsertOutcome, TokenStore};

/// Validates check-in attempts and commits attendance.
#[derive(Debug, Clone)]
pub struct CheckInService {
    store: Arc<dyn CheckInStore>,
    event_bus: EventBus,
}

impl CheckInService {
    /// Creates a new `CheckInService`.
    #[must_use]
    pub fn new(store: Arc<dyn CheckInStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Decides a single attempt.
    ///
    /// Business rejections are outcomes, not errors. Exactly one attendance
    /// row is written on [`CheckInOutcome::Success`] and none otherwise.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store is unreachable, or
    /// [`GatewayError::Internal`] if an event requires location but has none
    /// registered.
    pub async fn check_in(&self, attempt: CheckInAttempt) -> Result<CheckInOutcome, GatewayError> {
        let user_id = attempt.user_id;

        let Some(event) = self.lookup(&attempt).await? else {
            tracing::debug!(%user_id, "check-in rejected: invalid code");
            return Ok(CheckInOutcome::InvalidCode);
        };
        let event_id = event.id;

        if let Some(rejection) = Self::location_gate(&event, &attempt)? {
            tracing::debug!(%event_id, %user_id, outcome = rejection.as_str(), "check-in rejected");
            return Ok(rejection);
        }

        self.commit(event, user_id, CheckInMethod::Qr).await
    }

    /// Marks a user present at an event on an organizer's behalf.
    ///
    /// No code or location is checked. The duplicate gate and the commit are
    /// shared with scans: one attendance row per user and event either way.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist,
    /// or a storage error.
    pub async fn manual_check_in(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<CheckInOutcome, GatewayError> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(GatewayError::EventNotFound(event_id))?;
        self.commit(event, user_id, CheckInMethod::Manual).await
    }

    /// DuplicateGate then Commit.
    async fn commit(
        &self,
        event: Event,
        user_id: UserId,
        method: CheckInMethod,
    ) -> Result<CheckInOutcome, GatewayError> {
        let event_id = event.id;
        if self
            .store
            .find_attendance(user_id, event_id)
            .await?
            .is_some()
        {
            tracing::debug!(%event_id, %user_id, "already checked in");
            return Ok(CheckInOutcome::AlreadyCheckedIn {
                event_title: event.title,
            });
        }

        let new = NewAttendance {
            user_id,
            event_id,
            timestamp: Utc::now(),
            method,
            points_earned: event.points,
        };
        match self.store.try_insert(new).await? {
            InsertOutcome::Inserted(record) => {
                let _ = self.event_bus.publish(CheckInEvent::AttendeeCheckedIn {
                    event_id,
                    user_id,
                    attendance_id: record.id,
                    points_earned: record.points_earned,
                    timestamp: record.timestamp,
                });
                tracing::info!(
                    %event_id,
                    %user_id,
                    attendance_id = %record.id,
                    points = record.points_earned,
                    method = method.as_str(),
                    "check-in committed"
                );
                Ok(CheckInOutcome::Success {
                    points_earned: record.points_earned,
                    record,
                    event_title: event.title,
                })
            }
            InsertOutcome::AlreadyExists => {
                tracing::warn!(%event_id, %user_id, "concurrent check-in lost the insert race");
                Ok(CheckInOutcome::StorageConflict {
                    event_title: event.title,
                })
            }
        }
    }

    /// Resolves the attempt's code to a live event.
    async fn lookup(&self, attempt: &CheckInAttempt) -> Result<Option<Event>, GatewayError> {
        let Some(event_id) = self.store.resolve_code(&attempt.code).await? else {
            return Ok(None);
        };
        self.store.get_event(event_id).await
    }

    /// Applies the geofence when the event requires it.
    fn location_gate(
        event: &Event,
        attempt: &CheckInAttempt,
    ) -> Result<Option<CheckInOutcome>, GatewayError> {
        if !event.policy.requires_location() {
            return Ok(None);
        }
        let Some(location) = event.policy.enforced_location() else {
            return Err(GatewayError::Internal(format!(
                "event {} requires location but has none",
                event.id
            )));
        };
        let Some(point) = attempt.coordinate else {
            return Ok(Some(CheckInOutcome::LocationRequired { location }));
        };

        let (distance_m, inside) = location.geofence()?.evaluate(point);
        if inside {
            Ok(None)
        } else {
            Ok(Some(CheckInOutcome::OutOfRange {
                location,
                distance_m,
            }))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::geofence::tests::{coord, offset_north};
    use crate::domain::{
        CheckInCode, CheckInToken, CircleId, EventLocation, LocationPolicy, NewEvent, UserId,
    };
    use crate::persistence::memory::tests::StaleReadStore;
    use crate::persistence::{MemoryStore, TokenWrite};

    struct Fixture {
        service: CheckInService,
        store: Arc<MemoryStore>,
        event: Event,
        code: CheckInCode,
    }

    async fn fixture(policy: LocationPolicy) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let Ok(event) = store
            .create_event(NewEvent {
                circle_id: CircleId::new(1),
                title: "Community cleanup".to_string(),
                starts_at: Utc::now(),
                ends_at: None,
                points: 25,
                policy,
            })
            .await
        else {
            panic!("create failed");
        };
        let token = CheckInToken::mint(event.id, 24);
        let Ok(TokenWrite::Stored(_)) = store.insert_token(&token).await else {
            panic!("token insert failed");
        };
        let shared = Arc::clone(&store);
        let dyn_store: Arc<dyn CheckInStore> = shared;
        Fixture {
            service: CheckInService::new(dyn_store, EventBus::new(16)),
            store,
            event,
            code: token.code,
        }
    }

    fn fenced() -> LocationPolicy {
        let Ok(location) = EventLocation::new(37.7749, -122.4194, 100) else {
            panic!("valid location");
        };
        let Ok(policy) = LocationPolicy::new(true, Some(location)) else {
            panic!("valid policy");
        };
        policy
    }

    fn attempt(f: &Fixture, user: i64, point: Option<crate::domain::Coordinate>) -> CheckInAttempt {
        CheckInAttempt {
            code: f.code.clone(),
            user_id: UserId::new(user),
            coordinate: point,
        }
    }

    async fn decide(f: &Fixture, attempt: CheckInAttempt) -> CheckInOutcome {
        let Ok(outcome) = f.service.check_in(attempt).await else {
            panic!("check-in errored");
        };
        outcome
    }

    async fn records(f: &Fixture) -> usize {
        let Ok(rows) = f.store.event_attendance(f.event.id).await else {
            panic!("query failed");
        };
        rows.len()
    }

    #[tokio::test]
    async fn inside_radius_succeeds_with_event_points() {
        let f = fixture(fenced()).await;
        let near = offset_north(coord(37.7749, -122.4194), 50.0);
        let outcome = decide(&f, attempt(&f, 1, Some(near))).await;
        let CheckInOutcome::Success {
            points_earned,
            record,
            event_title,
        } = outcome
        else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(points_earned, f.event.points);
        assert_eq!(record.points_earned, 25);
        assert_eq!(event_title, "Community cleanup");
        assert_eq!(records(&f).await, 1);
    }

    #[tokio::test]
    async fn outside_radius_is_out_of_range() {
        let f = fixture(fenced()).await;
        let far = offset_north(coord(37.7749, -122.4194), 150.0);
        let outcome = decide(&f, attempt(&f, 1, Some(far))).await;
        let CheckInOutcome::OutOfRange { distance_m, .. } = outcome else {
            panic!("expected out of range, got {outcome:?}");
        };
        assert!((distance_m - 150.0).abs() < 1.0);
        assert_eq!(records(&f).await, 0);
    }

    #[tokio::test]
    async fn missing_fix_is_location_required() {
        let f = fixture(fenced()).await;
        let outcome = decide(&f, attempt(&f, 1, None)).await;
        let CheckInOutcome::LocationRequired { location } = outcome else {
            panic!("expected location required, got {outcome:?}");
        };
        assert_eq!(location.radius_m, 100);
        assert_eq!(records(&f).await, 0);
    }

    #[tokio::test]
    async fn open_event_ignores_location() {
        let f = fixture(LocationPolicy::open()).await;
        let outcome = decide(&f, attempt(&f, 1, None)).await;
        assert_eq!(outcome.as_str(), "success");

        let f = fixture(LocationPolicy::open()).await;
        let anywhere = coord(-33.86, 151.2);
        let outcome = decide(&f, attempt(&f, 2, Some(anywhere))).await;
        assert_eq!(outcome.as_str(), "success");
    }

    #[tokio::test]
    async fn unknown_code_is_invalid() {
        let f = fixture(LocationPolicy::open()).await;
        let Ok(code) = CheckInCode::extract("garbage-string") else {
            panic!("well-formed bare code");
        };
        let outcome = decide(
            &f,
            CheckInAttempt {
                code,
                user_id: UserId::new(1),
                coordinate: None,
            },
        )
        .await;
        assert_eq!(outcome, CheckInOutcome::InvalidCode);
        assert_eq!(records(&f).await, 0);
    }

    #[tokio::test]
    async fn invalid_code_wins_over_location() {
        let f = fixture(fenced()).await;
        let Ok(code) = CheckInCode::extract("nope") else {
            panic!("well-formed bare code");
        };
        let outcome = decide(
            &f,
            CheckInAttempt {
                code,
                user_id: UserId::new(1),
                coordinate: None,
            },
        )
        .await;
        assert_eq!(outcome, CheckInOutcome::InvalidCode);
    }

    #[tokio::test]
    async fn second_attempt_is_already_checked_in() {
        let f = fixture(LocationPolicy::open()).await;
        assert_eq!(decide(&f, attempt(&f, 9, None)).await.as_str(), "success");
        let second = decide(&f, attempt(&f, 9, None)).await;
        assert_eq!(
            second,
            CheckInOutcome::AlreadyCheckedIn {
                event_title: "Community cleanup".to_string()
            }
        );
        assert_eq!(records(&f).await, 1);
    }

    #[tokio::test]
    async fn duplicate_outside_fence_reports_location_first() {
        let f = fixture(fenced()).await;
        let near = offset_north(coord(37.7749, -122.4194), 10.0);
        assert_eq!(decide(&f, attempt(&f, 4, Some(near))).await.as_str(), "success");
        let far = offset_north(coord(37.7749, -122.4194), 500.0);
        let outcome = decide(&f, attempt(&f, 4, Some(far))).await;
        assert_eq!(outcome.as_str(), "out_of_range");
    }

    #[tokio::test]
    async fn success_publishes_checked_in_event() {
        let f = fixture(LocationPolicy::open()).await;
        let mut rx = f.service.event_bus.subscribe();
        assert_eq!(decide(&f, attempt(&f, 3, None)).await.as_str(), "success");
        let Ok(CheckInEvent::AttendeeCheckedIn {
            user_id,
            points_earned,
            ..
        }) = rx.try_recv()
        else {
            panic!("expected AttendeeCheckedIn");
        };
        assert_eq!(user_id, UserId::new(3));
        assert_eq!(points_earned, 25);
    }

    #[tokio::test]
    async fn concurrent_attempts_commit_once() {
        let f = fixture(LocationPolicy::open()).await;
        let mut handles = Vec::new();
        for _ in 0..16 {
            let service = f.service.clone();
            let next = attempt(&f, 77, None);
            handles.push(tokio::spawn(async move { service.check_in(next).await }));
        }

        let mut successes = 0;
        for handle in handles {
            let Ok(Ok(outcome)) = handle.await else {
                panic!("task failed");
            };
            match outcome {
                CheckInOutcome::Success { .. } => successes += 1,
                other => assert!(other.is_already_checked_in(), "unexpected {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(records(&f).await, 1);
    }

    #[tokio::test]
    async fn lost_insert_race_is_storage_conflict() {
        let store = Arc::new(StaleReadStore::default());
        let Ok(event) = store
            .create_event(NewEvent {
                circle_id: CircleId::new(1),
                title: "Night market".to_string(),
                starts_at: Utc::now(),
                ends_at: None,
                points: 5,
                policy: LocationPolicy::open(),
            })
            .await
        else {
            panic!("create failed");
        };
        let token = CheckInToken::mint(event.id, 24);
        let Ok(TokenWrite::Stored(_)) = store.insert_token(&token).await else {
            panic!("token insert failed");
        };
        let shared = Arc::clone(&store);
        let dyn_store: Arc<dyn CheckInStore> = shared;
        let service = CheckInService::new(dyn_store, EventBus::new(16));
        let mut rx = service.event_bus.subscribe();

        let scan = || CheckInAttempt {
            code: token.code.clone(),
            user_id: UserId::new(8),
            coordinate: None,
        };
        let Ok(first) = service.check_in(scan()).await else {
            panic!("check-in errored");
        };
        assert_eq!(first.as_str(), "success");
        let Ok(second) = service.check_in(scan()).await else {
            panic!("check-in errored");
        };
        assert_eq!(
            second,
            CheckInOutcome::StorageConflict {
                event_title: "Night market".to_string()
            }
        );
        assert!(second.is_already_checked_in());

        let Ok(rows) = store.event_attendance(event.id).await else {
            panic!("query failed");
        };
        assert_eq!(rows.len(), 1);

        let Ok(CheckInEvent::AttendeeCheckedIn { .. }) = rx.try_recv() else {
            panic!("expected one AttendeeCheckedIn");
        };
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn manual_check_in_skips_code_and_fence() {
        let f = fixture(fenced()).await;
        let Ok(outcome) = f
            .service
            .manual_check_in(f.event.id, UserId::new(21))
            .await
        else {
            panic!("manual check-in errored");
        };
        let CheckInOutcome::Success { record, .. } = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(record.method, CheckInMethod::Manual);
        assert_eq!(record.points_earned, 25);
        assert_eq!(records(&f).await, 1);
    }

    #[tokio::test]
    async fn manual_and_scan_share_one_row() {
        let f = fixture(LocationPolicy::open()).await;
        assert_eq!(decide(&f, attempt(&f, 30, None)).await.as_str(), "success");

        let Ok(outcome) = f
            .service
            .manual_check_in(f.event.id, UserId::new(30))
            .await
        else {
            panic!("manual check-in errored");
        };
        assert_eq!(outcome.as_str(), "already_checked_in");
        assert_eq!(records(&f).await, 1);
    }

    #[tokio::test]
    async fn manual_check_in_to_missing_event_is_not_found() {
        let f = fixture(LocationPolicy::open()).await;
        let Err(GatewayError::EventNotFound(id)) = f
            .service
            .manual_check_in(EventId::new(999), UserId::new(1))
            .await
        else {
            panic!("expected EventNotFound");
        };
        assert_eq!(id, EventId::new(999));
    }
}
