//! WebSocket layer: connection handling, message routing, feed filtering.
//!
//! The WebSocket endpoint at `/ws` streams check-in activity to organizers.
//! Clients subscribe by event id (or `"*"`) and receive each
//! [`crate::domain::CheckInEvent`] for those events as it happens.

pub mod connection;
pub mod feed_filter;
pub mod handler;
pub mod messages;
