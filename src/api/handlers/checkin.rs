//! Check-in handlers: submit a scanned code, or mark a user present.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    AlreadyCheckedInResponse, CheckInRecordDto, CheckInRejection, CheckInRequest,
    CheckInSuccessResponse, ManualCheckInRequest,
};
use crate::app_state::AppState;
use crate::domain::{CheckInOutcome, EventId};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /checkin` — Check in to an event with a scanned QR payload.
///
/// # Errors
///
/// Returns [`GatewayError`] for a malformed payload, an invalid coordinate
/// or a storage failure. Business rejections are regular responses.
#[utoipa::path(
    post,
    path = "/api/v1/checkin",
    tag = "Check-in",
    summary = "Check in with a QR code",
    description = "Validates the scanned code, applies the event's geofence when it requires location, and records attendance at most once per user and event.",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = CheckInSuccessResponse),
        (status = 200, description = "Already checked in", body = AlreadyCheckedInResponse),
        (status = 400, description = "Malformed payload or coordinate", body = ErrorResponse),
        (status = 403, description = "Outside the event radius", body = CheckInRejection),
        (status = 404, description = "Unknown or retired code", body = CheckInRejection),
        (status = 422, description = "Location required", body = CheckInRejection),
    )
)]
pub async fn check_in(
    State(state): State<AppState>,
    body: Result<Json<CheckInRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(req) = body?;
    let attempt = req.into_attempt()?;
    let outcome = state.checkin_service.check_in(attempt).await?;
    Ok(outcome_response(outcome))
}

/// `POST /events/:id/checkin` — Organizer check-in without a scan.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] if the event does not exist, or
/// [`GatewayError`] for an invalid body or a storage failure.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/checkin",
    tag = "Check-in",
    summary = "Mark a user present",
    description = "Records attendance with method `manual`. No code or location is required; a user already checked in gets the same 200 response as a repeat scan.",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    request_body = ManualCheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = CheckInSuccessResponse),
        (status = 200, description = "Already checked in", body = AlreadyCheckedInResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn manual_check_in(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    body: Result<Json<ManualCheckInRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(req) = body?;
    let outcome = state
        .checkin_service
        .manual_check_in(event_id, req.user_id)
        .await?;
    Ok(outcome_response(outcome))
}

/// Maps a validator outcome to its HTTP status and body.
fn outcome_response(outcome: CheckInOutcome) -> Response {
    match outcome {
        CheckInOutcome::Success {
            record,
            points_earned,
            event_title,
        } => (
            StatusCode::CREATED,
            Json(CheckInSuccessResponse {
                message: format!("Checked in to {event_title}"),
                points_earned,
                checkin: CheckInRecordDto::from(&record),
                event_title,
            }),
        )
            .into_response(),
        CheckInOutcome::AlreadyCheckedIn { event_title }
        | CheckInOutcome::StorageConflict { event_title } => (
            StatusCode::OK,
            Json(AlreadyCheckedInResponse {
                message: "You have already checked in to this event".to_string(),
                already_checked_in: true,
                points_earned: 0,
                event_title,
            }),
        )
            .into_response(),
        CheckInOutcome::InvalidCode => {
            (StatusCode::NOT_FOUND, Json(CheckInRejection::invalid_code())).into_response()
        }
        CheckInOutcome::LocationRequired { location } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(CheckInRejection::location_required(location)),
        )
            .into_response(),
        CheckInOutcome::OutOfRange {
            location,
            distance_m,
        } => (
            StatusCode::FORBIDDEN,
            Json(CheckInRejection::out_of_range(location, distance_m)),
        )
            .into_response(),
    }
}

/// Check-in routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkin", post(check_in))
        .route("/events/{id}/checkin", post(manual_check_in))
}
