//! # checkin-gateway
//!
//! REST API and WebSocket gateway for event check-in by QR code.
//!
//! Organizers get one opaque code per event, embedded in a
//! `{scheme}://event/checkin/{code}` URI. Attendees present the code with an
//! optional location fix; the gateway resolves it, applies the event's
//! geofence when one is required, and commits at most one attendance row
//! per user and event.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket, client::ScanSession)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Live Feed (ws/)
//!     │
//!     ├── CheckInService / TokenIssuer / EventService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── Codes, Geofence, Outcomes (domain/)
//!     │
//!     └── CheckInStore: PostgreSQL or in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
