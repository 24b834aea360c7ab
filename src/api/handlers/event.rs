//! Event handlers: create, get, location policy, QR codes and attendees.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    CreateEventRequest, EventAttendeesResponse, EventResponse, QrCodeResponse,
    UpdateLocationRequest,
};
use crate::app_state::AppState;
use crate::domain::EventId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /events` — Create an event.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid input.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create an event",
    description = "Creates an event in a circle. An event that requires location must carry latitude and longitude; the radius defaults to 100 m.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = body?;
    let event = state
        .event_service
        .create_event(req.into_new_event()?)
        .await?;
    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

/// `GET /events/:id` — Event details.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get event details",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    responses(
        (status = 200, description = "Event details", body = EventResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = state.event_service.get_event(id).await?;
    Ok(Json(EventResponse::from(event)))
}

/// `PUT /events/:id/location` — Update the location requirement.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid input or an unknown event.
#[utoipa::path(
    put,
    path = "/api/v1/events/{id}/location",
    tag = "Events",
    summary = "Update location settings",
    description = "Sets whether check-in requires presence and where the venue is. Takes effect for the next attempt.",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Updated event", body = EventResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    body: Result<Json<UpdateLocationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = body?;
    let event = state
        .event_service
        .update_location(id, req.into_policy()?)
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// `GET /events/:id/qr_code` — The event's check-in code.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/qr_code",
    tag = "Events",
    summary = "Get the event's QR code",
    description = "Returns the event's live check-in code and the URI to encode in the QR symbol. The code is issued on first request.",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    responses(
        (status = 200, description = "Live code", body = QrCodeResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_qr_code(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    let code = state.token_issuer.code_for_event(id).await?;
    let url = state.token_issuer.qr_code_url(&code.token);
    Ok(Json(QrCodeResponse::new(code, url)))
}

/// `POST /events/:id/qr_code/regenerate` — Replace the event's code.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/qr_code/regenerate",
    tag = "Events",
    summary = "Regenerate the event's QR code",
    description = "Mints a new code. The previous code is rejected as invalid from this moment on; existing attendance is unaffected.",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    responses(
        (status = 200, description = "New live code", body = QrCodeResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn regenerate_qr_code(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    let code = state.token_issuer.regenerate_for_event(id).await?;
    let url = state.token_issuer.qr_code_url(&code.token);
    Ok(Json(QrCodeResponse::new(code, url)))
}

/// `GET /events/:id/attendees` — Who checked in.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/attendees",
    tag = "Events",
    summary = "List attendees",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    responses(
        (status = 200, description = "Attendees", body = EventAttendeesResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_attendees(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    let attendance = state.event_service.attendees(id).await?;
    Ok(Json(EventAttendeesResponse::from(attendance)))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/location", put(update_location))
        .route("/events/{id}/qr_code", get(get_qr_code))
        .route("/events/{id}/qr_code/regenerate", post(regenerate_qr_code))
        .route("/events/{id}/attendees", get(get_attendees))
}
