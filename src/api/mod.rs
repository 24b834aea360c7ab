//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All endpoints are mounted under `/api/v1`, except `/health`. The OpenAPI
//! document is served at `/api-docs/openapi.json`, with Swagger UI at
//! `/swagger-ui` when the `swagger-ui` feature is enabled.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "checkin-gateway",
        description = "Event check-in by QR code with optional geofencing."
    ),
    paths(
        handlers::checkin::check_in,
        handlers::checkin::manual_check_in,
        handlers::event::create_event,
        handlers::event::get_event,
        handlers::event::update_location,
        handlers::event::get_qr_code,
        handlers::event::regenerate_qr_code,
        handlers::event::get_attendees,
        handlers::circle::get_events,
        handlers::circle::get_qr_codes,
        handlers::circle::get_leaderboard,
        handlers::user::get_checkins,
        handlers::user::get_points,
        handlers::system::health_handler,
    ),
    tags(
        (name = "Check-in", description = "Scan submission"),
        (name = "Events", description = "Event management and codes"),
        (name = "Circles", description = "Circle-wide views"),
        (name = "Users", description = "Attendee history and points"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    );

    router
}

/// Builds the servable application: REST routes, the `/ws` live feed and
/// the HTTP middleware stack.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    build_router()
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use serde_json::{Value, json};

    use super::*;
    use crate::domain::EventBus;
    use crate::persistence::memory::tests::StaleReadStore;
    use crate::persistence::{CheckInStore, MemoryStore};

    fn app() -> Router {
        let store: Arc<dyn CheckInStore> = Arc::new(MemoryStore::new());
        let state = AppState::new(store, EventBus::new(16), 24, "circl");
        build_app(state, Duration::from_secs(5))
    }

    #[test]
    fn openapi_lists_checkin_path() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/checkin"));
        assert!(doc.paths.paths.contains_key("/api/v1/events/{id}/qr_code"));
    }

    #[tokio::test]
    async fn health_is_served_at_root() {
        let Ok(request) = Request::builder().uri("/health").body(Body::empty()) else {
            panic!("request build failed");
        };
        let Ok(response) = app().oneshot(request).await else {
            panic!("router failed");
        };
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_gets_error_envelope() {
        let Ok(request) = Request::builder()
            .method("POST")
            .uri("/api/v1/checkin")
            .header("content-type", "application/json")
            .body(Body::from("{\"qr_code\":"))
        else {
            panic!("request build failed");
        };
        let Ok(response) = app().oneshot(request).await else {
            panic!("router failed");
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), 64 * 1024).await else {
            panic!("body read failed");
        };
        let Ok(json) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
            panic!("body is not JSON");
        };
        assert_eq!(json["error"]["code"], 1001);
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let Ok(request) = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
        else {
            panic!("request build failed");
        };
        let Ok(response) = app.clone().oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), 64 * 1024).await else {
            panic!("body read failed");
        };
        let Ok(json) = serde_json::from_slice::<Value>(&bytes) else {
            panic!("body is not JSON");
        };
        (status, json)
    }

    #[tokio::test]
    async fn lost_insert_race_answers_already_checked_in() {
        let store: Arc<dyn CheckInStore> = Arc::new(StaleReadStore::default());
        let app = build_app(
            AppState::new(store, EventBus::new(16), 24, "circl"),
            Duration::from_secs(5),
        );

        let (status, event) = call(
            &app,
            "POST",
            "/api/v1/events",
            json!({
                "circle_id": 1,
                "title": "Harbor tour",
                "starts_at": "2026-06-01T18:00:00Z",
                "points": 12
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let qr_uri = format!("/api/v1/events/{}/qr_code", event["event_id"]);
        let (_, code) = call(&app, "GET", &qr_uri, Value::Null).await;
        let scan = json!({ "qr_code": code["qr_code_url"], "user_id": 3 });

        let (first, _) = call(&app, "POST", "/api/v1/checkin", scan.clone()).await;
        assert_eq!(first, StatusCode::CREATED);

        let (second, body) = call(&app, "POST", "/api/v1/checkin", scan).await;
        assert_eq!(second, StatusCode::OK);
        assert_eq!(body["already_checked_in"], true);
        assert_eq!(body["points_earned"], 0);
        assert_eq!(body["event_title"], "Harbor tour");
    }
}
