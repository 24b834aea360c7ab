//! Circle handlers: calendar, code sheet and leaderboard.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    CalendarQuery, CircleEventsResponse, CircleQrCodeDto, CircleQrCodesResponse,
    LeaderboardResponse, LimitQuery,
};
use crate::app_state::AppState;
use crate::domain::CircleId;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /circles/:id/events` — The circle's calendar.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for a bad filter, or a storage
/// error.
#[utoipa::path(
    get,
    path = "/api/v1/circles/{id}/events",
    tag = "Circles",
    summary = "List a circle's events",
    description = "Returns the circle's events ordered by start time, optionally limited to one day or to the next few days. No codes are issued.",
    params(
        ("id" = i64, Path, description = "Circle id"),
        CalendarQuery,
    ),
    responses(
        (status = 200, description = "Calendar", body = CircleEventsResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn get_events(
    State(state): State<AppState>,
    Path(circle_id): Path<CircleId>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Query(query) = query?;
    let events = state
        .event_service
        .circle_events(circle_id, query.into_window()?)
        .await?;
    Ok(Json(CircleEventsResponse::new(circle_id, events)))
}

/// `GET /circles/:id/qr_codes` — Every event of a circle with its code.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/circles/{id}/qr_codes",
    tag = "Circles",
    summary = "List a circle's QR codes",
    description = "Returns each event of the circle with its live code, check-in URI and attendee count. Events without a code get one issued.",
    params(
        ("id" = i64, Path, description = "Circle id"),
    ),
    responses(
        (status = 200, description = "Code sheet", body = CircleQrCodesResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn get_qr_codes(
    State(state): State<AppState>,
    Path(circle_id): Path<CircleId>,
) -> Result<impl IntoResponse, GatewayError> {
    let codes = state.token_issuer.circle_codes(circle_id).await?;
    let events = codes
        .into_iter()
        .map(|entry| {
            let url = state.token_issuer.qr_code_url(&entry.code.token);
            CircleQrCodeDto::new(entry, url)
        })
        .collect();
    Ok(Json(CircleQrCodesResponse { circle_id, events }))
}

/// `GET /circles/:id/leaderboard` — Members ranked by points.
///
/// # Errors
///
/// Returns [`GatewayError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/circles/{id}/leaderboard",
    tag = "Circles",
    summary = "Circle leaderboard",
    description = "Ranks users by points earned at the circle's events, highest first.",
    params(
        ("id" = i64, Path, description = "Circle id"),
        LimitQuery,
    ),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(circle_id): Path<CircleId>,
    Query(query): Query<LimitQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let ranked = state
        .event_service
        .leaderboard(circle_id, query.limit)
        .await?;
    Ok(Json(LeaderboardResponse::new(circle_id, ranked)))
}

/// Circle routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/circles/{id}/events", get(get_events))
        .route("/circles/{id}/qr_codes", get(get_qr_codes))
        .route("/circles/{id}/leaderboard", get(get_leaderboard))
}
