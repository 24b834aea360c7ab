//! Shared harness: a gateway on an ephemeral port backed by the in-memory
//! store, plus small JSON helpers.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use checkin_gateway::api;
use checkin_gateway::app_state::AppState;
use checkin_gateway::domain::EventBus;
use checkin_gateway::persistence::{CheckInStore, MemoryStore};

/// A running gateway.
#[derive(Debug)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Starts a gateway with a fresh in-memory store.
    pub async fn spawn() -> Self {
        let store: Arc<dyn CheckInStore> = Arc::new(MemoryStore::new());
        let state = AppState::new(store, EventBus::new(1024), 24, "circl");
        let app = api::build_app(state, Duration::from_secs(10));

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let Ok(resp) = self.client.get(self.url(path)).send().await else {
            panic!("GET {path} failed");
        };
        Self::decode(resp).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let Ok(resp) = self.client.post(self.url(path)).json(body).send().await else {
            panic!("POST {path} failed");
        };
        Self::decode(resp).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let Ok(resp) = self.client.put(self.url(path)).json(body).send().await else {
            panic!("PUT {path} failed");
        };
        Self::decode(resp).await
    }

    async fn decode(resp: reqwest::Response) -> (StatusCode, Value) {
        let status = resp.status();
        let Ok(body) = resp.json::<Value>().await else {
            panic!("response body is not JSON (status {status})");
        };
        (status, body)
    }

    /// Creates an event and returns its id.
    pub async fn create_event(&self, body: Value) -> i64 {
        let (status, created) = self.post("/api/v1/events", &body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
        let Some(id) = created["event_id"].as_i64() else {
            panic!("event_id missing: {created}");
        };
        id
    }

    /// Fetches (issuing on first call) the event's QR payload URL.
    pub async fn qr_url(&self, event_id: i64) -> String {
        let (status, body) = self.get(&format!("/api/v1/events/{event_id}/qr_code")).await;
        assert_eq!(status, StatusCode::OK, "qr_code failed: {body}");
        let Some(url) = body["qr_code_url"].as_str() else {
            panic!("qr_code_url missing: {body}");
        };
        url.to_string()
    }

    pub async fn check_in(&self, body: Value) -> (StatusCode, Value) {
        self.post("/api/v1/checkin", &body).await
    }
}

pub const VENUE_LAT: f64 = 37.7749;
pub const VENUE_LON: f64 = -122.4194;

/// Latitude `meters` due north of the venue.
pub fn north_of_venue(meters: f64) -> f64 {
    VENUE_LAT + (meters / 6_371_000.0).to_degrees()
}

/// A fenced event: 100 m around the venue, 25 points.
pub fn fenced_event(circle_id: i64, title: &str) -> Value {
    json!({
        "circle_id": circle_id,
        "title": title,
        "starts_at": "2026-06-01T18:00:00Z",
        "points": 25,
        "requires_location": true,
        "latitude": VENUE_LAT,
        "longitude": VENUE_LON,
        "radius": 100
    })
}

/// An event without a location requirement.
pub fn open_event(circle_id: i64, title: &str, points: u32) -> Value {
    json!({
        "circle_id": circle_id,
        "title": title,
        "starts_at": "2026-06-01T18:00:00Z",
        "points": points,
        "requires_location": false
    })
}
