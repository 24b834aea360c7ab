//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::persistence::CheckInStore;
use crate::service::{CheckInService, EventService, TokenIssuer};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Check-in validator.
    pub checkin_service: Arc<CheckInService>,
    /// Code issuance and regeneration.
    pub token_issuer: Arc<TokenIssuer>,
    /// Event management and attendance queries.
    pub event_service: Arc<EventService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires every service onto one store and one bus.
    #[must_use]
    pub fn new(
        store: Arc<dyn CheckInStore>,
        event_bus: EventBus,
        code_entropy_bytes: usize,
        qr_scheme: &str,
    ) -> Self {
        Self {
            checkin_service: Arc::new(CheckInService::new(
                Arc::clone(&store),
                event_bus.clone(),
            )),
            token_issuer: Arc::new(TokenIssuer::new(
                Arc::clone(&store),
                event_bus.clone(),
                code_entropy_bytes,
                qr_scheme,
            )),
            event_service: Arc::new(EventService::new(store, event_bus.clone())),
            event_bus,
        }
    }
}
