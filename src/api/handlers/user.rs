//! User handlers: check-in history and points.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    CheckInHistoryDto, CircleScopeQuery, UserCheckInsResponse, UserPointsResponse,
};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /users/:id/checkins` — A user's check-in history.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/checkins",
    tag = "Users",
    summary = "Check-in history",
    description = "Lists the user's check-ins with event titles, newest first, optionally within one circle.",
    params(
        ("id" = i64, Path, description = "User id"),
        CircleScopeQuery,
    ),
    responses(
        (status = 200, description = "History", body = UserCheckInsResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn get_checkins(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(scope): Query<CircleScopeQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let history = state
        .event_service
        .user_history(user_id, scope.circle_id)
        .await?;
    let checkins: Vec<CheckInHistoryDto> =
        history.into_iter().map(CheckInHistoryDto::from).collect();
    Ok(Json(UserCheckInsResponse {
        user_id,
        total: checkins.len(),
        checkins,
    }))
}

/// `GET /users/:id/points` — A user's point total.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/points",
    tag = "Users",
    summary = "Points summary",
    params(
        ("id" = i64, Path, description = "User id"),
        CircleScopeQuery,
    ),
    responses(
        (status = 200, description = "Points", body = UserPointsResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn get_points(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(scope): Query<CircleScopeQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let summary = state
        .event_service
        .user_points(user_id, scope.circle_id)
        .await?;
    Ok(Json(UserPointsResponse::from(summary)))
}

/// User routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{id}/checkins", get(get_checkins))
        .route("/users/{id}/points", get(get_points))
}
