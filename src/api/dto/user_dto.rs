//! Attendee-facing read models: history, points and leaderboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    AttendanceId, CheckInHistoryEntry, CircleId, EventId, LeaderboardEntry, PointsSummary, UserId,
};

/// One past check-in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckInHistoryDto {
    /// Attendance row id.
    pub id: AttendanceId,
    /// Event attended.
    pub event_id: EventId,
    /// Event title.
    pub event_title: String,
    /// Owning circle.
    pub circle_id: CircleId,
    /// Points awarded.
    pub points_earned: u32,
    /// Commit time.
    pub checked_in_at: DateTime<Utc>,
}

impl From<CheckInHistoryEntry> for CheckInHistoryDto {
    fn from(entry: CheckInHistoryEntry) -> Self {
        Self {
            id: entry.id,
            event_id: entry.event_id,
            event_title: entry.event_title,
            circle_id: entry.circle_id,
            points_earned: entry.points_earned,
            checked_in_at: entry.checked_in_at,
        }
    }
}

/// Body of `GET /users/{id}/checkins`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCheckInsResponse {
    /// Attendee.
    pub user_id: UserId,
    /// Number of entries.
    pub total: usize,
    /// Check-ins, newest first.
    pub checkins: Vec<CheckInHistoryDto>,
}

/// Body of `GET /users/{id}/points`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPointsResponse {
    /// Attendee.
    pub user_id: UserId,
    /// Circle scope, if any.
    pub circle_id: Option<CircleId>,
    /// Sum of points earned.
    pub total_points: u64,
    /// Number of check-ins.
    pub checkin_count: u64,
}

impl From<PointsSummary> for UserPointsResponse {
    fn from(summary: PointsSummary) -> Self {
        Self {
            user_id: summary.user_id,
            circle_id: summary.circle_id,
            total_points: summary.total_points,
            checkin_count: summary.checkin_count,
        }
    }
}

/// One leaderboard position.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntryDto {
    /// 1-based rank.
    pub rank: usize,
    /// Attendee.
    pub user_id: UserId,
    /// Points earned in the circle.
    pub total_points: u64,
    /// Check-ins in the circle.
    pub checkin_count: u64,
}

/// Body of `GET /circles/{id}/leaderboard`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Circle id.
    pub circle_id: CircleId,
    /// Ranked entries.
    pub entries: Vec<LeaderboardEntryDto>,
}

impl LeaderboardResponse {
    /// Numbers the ranked entries.
    #[must_use]
    pub fn new(circle_id: CircleId, ranked: Vec<LeaderboardEntry>) -> Self {
        Self {
            circle_id,
            entries: ranked
                .into_iter()
                .enumerate()
                .map(|(i, e)| LeaderboardEntryDto {
                    rank: i + 1,
                    user_id: e.user_id,
                    total_points: e.total_points,
                    checkin_count: e.checkin_count,
                })
                .collect(),
        }
    }
}
