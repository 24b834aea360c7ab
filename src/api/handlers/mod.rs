//! REST endpoint handlers organized by resource.

pub mod checkin;
pub mod circle;
pub mod event;
pub mod system;
pub mod user;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(checkin::routes())
        .merge(event::routes())
        .merge(circle::routes())
        .merge(user::routes())
}
