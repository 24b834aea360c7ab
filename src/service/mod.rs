//! Service layer: business logic orchestration.
//!
//! [`CheckInService`] runs the validator, [`TokenIssuer`] owns event codes
//! and [`EventService`] covers organizer updates and attendance queries.
//! All three share one store and emit through the
//! [`super::domain::EventBus`].

pub mod checkin_service;
pub mod event_service;
pub mod token_issuer;

pub use checkin_service::CheckInService;
pub use event_service::EventService;
pub use token_issuer::TokenIssuer;
