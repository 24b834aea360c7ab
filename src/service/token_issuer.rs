//! Token issuer: mints, persists and regenerates event check-in codes.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{CheckInEvent, CheckInToken, CircleId, Event, EventBus, EventId};
use crate::error::GatewayError;
use crate::persistence::{AttendanceStore, CheckInStore, EventStore, TokenStore, TokenWrite};

/// How many freshly minted codes are tried before giving up on a collision.
pub const MAX_MINT_ATTEMPTS: usize = 3;

/// An event together with its live code.
#[derive(Debug, Clone, PartialEq)]
pub struct EventCode {
    /// The event.
    pub event: Event,
    /// Its live token.
    pub token: CheckInToken,
}

/// One entry of a circle's code sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleCode {
    /// Event and live code.
    pub code: EventCode,
    /// Number of attendees checked in so far.
    pub attendee_count: u64,
}

/// Issues one opaque code per event.
///
/// Issuing is idempotent: the first call mints and stores a code, later
/// calls return it. [`TokenIssuer::regenerate`] swaps it for a new one and
/// the old code stops resolving at once. Never touches attendance.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    store: Arc<dyn CheckInStore>,
    event_bus: EventBus,
    entropy_bytes: usize,
    scheme: String,
}

impl TokenIssuer {
    /// Creates a new issuer.
    #[must_use]
    pub fn new(
        store: Arc<dyn CheckInStore>,
        event_bus: EventBus,
        entropy_bytes: usize,
        scheme: impl Into<String>,
    ) -> Self {
        Self {
            store,
            event_bus,
            entropy_bytes,
            scheme: scheme.into(),
        }
    }

    /// URI scheme used for QR payloads.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The resolvable URI embedding `token`'s code.
    #[must_use]
    pub fn qr_code_url(&self, token: &CheckInToken) -> String {
        token.code.to_uri(&self.scheme)
    }

    /// Returns the event's token, minting it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] for an unknown event,
    /// [`GatewayError::Internal`] if no unique code could be minted, or a
    /// storage error.
    pub async fn issue(&self, event_id: EventId) -> Result<CheckInToken, GatewayError> {
        if let Some(existing) = self.store.token_for_event(event_id).await? {
            return Ok(existing);
        }

        for attempt in 1..=MAX_MINT_ATTEMPTS {
            let token = CheckInToken::mint(event_id, self.entropy_bytes);
            match self.store.insert_token(&token).await? {
                TokenWrite::Stored(token) => {
                    let _ = self.event_bus.publish(CheckInEvent::CodeIssued {
                        event_id,
                        timestamp: token.issued_at,
                    });
                    tracing::info!(%event_id, "check-in code issued");
                    return Ok(token);
                }
                TokenWrite::Existing(token) => return Ok(token),
                TokenWrite::CodeTaken => {
                    tracing::warn!(%event_id, attempt, "minted code collided, retrying");
                }
            }
        }

        Err(collision_exhausted(event_id))
    }

    /// Replaces the event's code. The previous code resolves to nothing from
    /// the moment this returns.
    ///
    /// # Errors
    ///
    /// Same as [`TokenIssuer::issue`].
    pub async fn regenerate(&self, event_id: EventId) -> Result<CheckInToken, GatewayError> {
        for attempt in 1..=MAX_MINT_ATTEMPTS {
            let token = CheckInToken::mint(event_id, self.entropy_bytes);
            match self.store.replace_token(&token).await? {
                TokenWrite::Stored(token) | TokenWrite::Existing(token) => {
                    let _ = self.event_bus.publish(CheckInEvent::CodeRegenerated {
                        event_id,
                        timestamp: Utc::now(),
                    });
                    tracing::info!(%event_id, "check-in code regenerated");
                    return Ok(token);
                }
                TokenWrite::CodeTaken => {
                    tracing::warn!(%event_id, attempt, "minted code collided, retrying");
                }
            }
        }

        Err(collision_exhausted(event_id))
    }

    /// Loads an event and its code, issuing one if needed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] for an unknown event, or any
    /// error of [`TokenIssuer::issue`].
    pub async fn code_for_event(&self, event_id: EventId) -> Result<EventCode, GatewayError> {
        let event = self.load_event(event_id).await?;
        let token = self.issue(event_id).await?;
        Ok(EventCode { event, token })
    }

    /// Regenerates an event's code and returns it with the event.
    ///
    /// # Errors
    ///
    /// Same as [`TokenIssuer::code_for_event`].
    pub async fn regenerate_for_event(&self, event_id: EventId) -> Result<EventCode, GatewayError> {
        let event = self.load_event(event_id).await?;
        let token = self.regenerate(event_id).await?;
        Ok(EventCode { event, token })
    }

    /// Lists every event of a circle with its code and attendee count,
    /// issuing codes for events that have none yet.
    ///
    /// # Errors
    ///
    /// Returns a storage error, or [`GatewayError::Internal`] on exhausted
    /// code collisions.
    pub async fn circle_codes(&self, circle_id: CircleId) -> Result<Vec<CircleCode>, GatewayError> {
        let events = self.store.list_circle_events(circle_id).await?;
        let mut codes = Vec::with_capacity(events.len());
        for event in events {
            let token = self.issue(event.id).await?;
            let attendee_count = self.store.attendee_count(event.id).await?;
            codes.push(CircleCode {
                code: EventCode { event, token },
                attendee_count,
            });
        }
        Ok(codes)
    }

    async fn load_event(&self, event_id: EventId) -> Result<Event, GatewayError> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or(GatewayError::EventNotFound(event_id))
    }
}

fn collision_exhausted(event_id: EventId) -> GatewayError {
    GatewayError::Internal(format!(
        "no unique code for event {event_id} after {MAX_MINT_ATTEMPTS} attempts"
    ))
}
