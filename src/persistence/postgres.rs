//! PostgreSQL implementation of the persistence layer.
//!
//! Uniqueness is enforced by the schema in `migrations/`: one token per
//! event, globally unique codes, and one attendance row per
//! `(user_id, event_id)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{
    ATTENDANCE_COLUMNS, AttendanceRow, EVENT_COLUMNS, EventRow, HistoryRow, StoredAttendance,
    StoredEvent, history_entry, policy_columns, to_i32, to_u64, token,
};
use super::{AttendanceStore, EventStore, InsertOutcome, TokenStore, TokenWrite};
use crate::domain::{
    AttendanceId, AttendanceRecord, CheckInCode, CheckInHistoryEntry, CheckInToken, CircleId,
    Event, EventId, LeaderboardEntry, LocationPolicy, NewAttendance, NewEvent, PointsSummary,
    UserId,
};
use crate::error::GatewayError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))
    }
}

/// SQLSTATE of a database error, if any.
fn sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

fn db_error(err: &sqlx::Error) -> GatewayError {
    GatewayError::PersistenceError(err.to_string())
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn ping(&self) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(&e))?;
        Ok(())
    }

    async fn create_event(&self, new: NewEvent) -> Result<Event, GatewayError> {
        let (requires_location, latitude, longitude, radius_m) = policy_columns(&new.policy)?;
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "INSERT INTO events (circle_id, title, starts_at, ends_at, points, \
             requires_location, latitude, longitude, radius_m) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {EVENT_COLUMNS}"
        ))
        .bind(new.circle_id.get())
        .bind(&new.title)
        .bind(new.starts_at)
        .bind(new.ends_at)
        .bind(to_i32(new.points)?)
        .bind(requires_location)
        .bind(latitude)
        .bind(longitude)
        .bind(radius_m)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        Event::try_from(StoredEvent::from(row))
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, GatewayError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        row.map(|r| Event::try_from(StoredEvent::from(r)))
            .transpose()
    }

    async fn update_policy(
        &self,
        id: EventId,
        policy: LocationPolicy,
    ) -> Result<Option<Event>, GatewayError> {
        let (requires_location, latitude, longitude, radius_m) = policy_columns(&policy)?;
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET requires_location = $2, latitude = $3, longitude = $4, \
             radius_m = $5 WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id.get())
        .bind(requires_location)
        .bind(latitude)
        .bind(longitude)
        .bind(radius_m)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        row.map(|r| Event::try_from(StoredEvent::from(r)))
            .transpose()
    }

    async fn list_circle_events(&self, circle_id: CircleId) -> Result<Vec<Event>, GatewayError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE circle_id = $1 ORDER BY starts_at, id"
        ))
        .bind(circle_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        rows.into_iter()
            .map(|r| Event::try_from(StoredEvent::from(r)))
            .collect()
    }
}

#[async_trait]
impl TokenStore for PostgresStore {
    async fn insert_token(&self, token: &CheckInToken) -> Result<TokenWrite, GatewayError> {
        let inserted = sqlx::query(
            "INSERT INTO checkin_tokens (event_id, code, issued_at) VALUES ($1, $2, $3) \
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(token.event_id.get())
        .bind(token.code.as_str())
        .bind(token.issued_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(result) if result.rows_affected() == 1 => Ok(TokenWrite::Stored(token.clone())),
            Ok(_) => match self.token_for_event(token.event_id).await? {
                Some(existing) => Ok(TokenWrite::Existing(existing)),
                None => Err(GatewayError::PersistenceError(format!(
                    "token for event {} vanished after conflict",
                    token.event_id
                ))),
            },
            Err(e) => token_write_error(&e, token.event_id),
        }
    }

    async fn replace_token(&self, token: &CheckInToken) -> Result<TokenWrite, GatewayError> {
        let replaced = sqlx::query(
            "INSERT INTO checkin_tokens (event_id, code, issued_at) VALUES ($1, $2, $3) \
             ON CONFLICT (event_id) DO UPDATE SET code = EXCLUDED.code, issued_at = EXCLUDED.issued_at",
        )
        .bind(token.event_id.get())
        .bind(token.code.as_str())
        .bind(token.issued_at)
        .execute(&self.pool)
        .await;

        match replaced {
            Ok(_) => Ok(TokenWrite::Stored(token.clone())),
            Err(e) => token_write_error(&e, token.event_id),
        }
    }

    async fn token_for_event(&self, id: EventId) -> Result<Option<CheckInToken>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, String, DateTime<Utc>)>(
            "SELECT event_id, code, issued_at FROM checkin_tokens WHERE event_id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        Ok(row.map(token))
    }

    async fn resolve_code(&self, code: &CheckInCode) -> Result<Option<EventId>, GatewayError> {
        let row =
            sqlx::query_scalar::<_, i64>("SELECT event_id FROM checkin_tokens WHERE code = $1")
                .bind(code.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error(&e))?;

        Ok(row.map(EventId::new))
    }
}

/// Maps constraint violations of a token write.
fn token_write_error(err: &sqlx::Error, event_id: EventId) -> Result<TokenWrite, GatewayError> {
    match sqlstate(err).as_deref() {
        Some(UNIQUE_VIOLATION) => Ok(TokenWrite::CodeTaken),
        Some(FOREIGN_KEY_VIOLATION) => Err(GatewayError::EventNotFound(event_id)),
        _ => Err(db_error(err)),
    }
}

#[async_trait]
impl AttendanceStore for PostgresStore {
    async fn find_attendance(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Option<AttendanceRecord>, GatewayError> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = $1 AND event_id = $2"
        ))
        .bind(user_id.get())
        .bind(event_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        row.map(|r| AttendanceRecord::try_from(StoredAttendance::from(r)))
            .transpose()
    }

    async fn try_insert(&self, new: NewAttendance) -> Result<InsertOutcome, GatewayError> {
        let inserted = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "INSERT INTO attendance (user_id, event_id, checked_in_at, method, points_earned) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, event_id) DO NOTHING RETURNING id, checked_in_at",
        )
        .bind(new.user_id.get())
        .bind(new.event_id.get())
        .bind(new.timestamp)
        .bind(new.method.as_str())
        .bind(to_i32(new.points_earned)?)
        .fetch_optional(&self.pool)
        .await;

        match inserted {
            // The column keeps microseconds; report what later reads return.
            Ok(Some((id, checked_in_at))) => {
                let mut record = new.into_record(AttendanceId::new(id));
                record.timestamp = checked_in_at;
                Ok(InsertOutcome::Inserted(record))
            }
            Ok(None) => Ok(InsertOutcome::AlreadyExists),
            Err(e) => match sqlstate(&e).as_deref() {
                Some(UNIQUE_VIOLATION) => Ok(InsertOutcome::AlreadyExists),
                Some(FOREIGN_KEY_VIOLATION) => Err(GatewayError::EventNotFound(new.event_id)),
                _ => Err(db_error(&e)),
            },
        }
    }

    async fn event_attendance(
        &self,
        event_id: EventId,
    ) -> Result<Vec<AttendanceRecord>, GatewayError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE event_id = $1 \
             ORDER BY checked_in_at, id"
        ))
        .bind(event_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        rows.into_iter()
            .map(|r| AttendanceRecord::try_from(StoredAttendance::from(r)))
            .collect()
    }

    async fn attendee_count(&self, event_id: EventId) -> Result<u64, GatewayError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance WHERE event_id = $1")
                .bind(event_id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error(&e))?;

        to_u64(count, "attendee_count")
    }

    async fn user_history(
        &self,
        user_id: UserId,
        circle_id: Option<CircleId>,
    ) -> Result<Vec<CheckInHistoryEntry>, GatewayError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT a.id, a.event_id, e.title, e.circle_id, a.points_earned, a.checked_in_at \
             FROM attendance a JOIN events e ON e.id = a.event_id \
             WHERE a.user_id = $1 AND ($2::BIGINT IS NULL OR e.circle_id = $2) \
             ORDER BY a.checked_in_at DESC, a.id DESC",
        )
        .bind(user_id.get())
        .bind(circle_id.map(CircleId::get))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        rows.into_iter().map(history_entry).collect()
    }

    async fn user_points(
        &self,
        user_id: UserId,
        circle_id: Option<CircleId>,
    ) -> Result<PointsSummary, GatewayError> {
        let (total, count) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COALESCE(SUM(a.points_earned), 0)::BIGINT, COUNT(*) \
             FROM attendance a JOIN events e ON e.id = a.event_id \
             WHERE a.user_id = $1 AND ($2::BIGINT IS NULL OR e.circle_id = $2)",
        )
        .bind(user_id.get())
        .bind(circle_id.map(CircleId::get))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        Ok(PointsSummary {
            user_id,
            circle_id,
            total_points: to_u64(total, "total_points")?,
            checkin_count: to_u64(count, "checkin_count")?,
        })
    }

    async fn leaderboard(
        &self,
        circle_id: CircleId,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, GatewayError> {
        let rows = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT a.user_id, SUM(a.points_earned)::BIGINT AS total, COUNT(*) \
             FROM attendance a JOIN events e ON e.id = a.event_id \
             WHERE e.circle_id = $1 \
             GROUP BY a.user_id ORDER BY total DESC, a.user_id ASC LIMIT $2",
        )
        .bind(circle_id.get())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        rows.into_iter()
            .map(|(user_id, total, count)| {
                Ok(LeaderboardEntry {
                    user_id: UserId::new(user_id),
                    total_points: to_u64(total, "total_points")?,
                    checkin_count: to_u64(count, "checkin_count")?,
                })
            })
            .collect()
    }
}
