//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! applying subscription commands and forwarding filtered check-in events.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::feed_filter::FeedFilter;
use super::messages::{WsCommand, WsMessage, WsMessageType};
use crate::domain::CheckInEvent;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads subscription commands from the client and replies to each.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(socket: WebSocket, mut event_rx: broadcast::Receiver<CheckInEvent>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut filter = FeedFilter::default();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut filter);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(checkin_event) => {
                        if !filter.admits(&checkin_event) {
                            continue;
                        }
                        let Some(json) = event_frame(&checkin_event) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Serializes a domain event into an `event` envelope.
fn event_frame(event: &CheckInEvent) -> Option<String> {
    let payload = serde_json::to_value(event).ok()?;
    let msg = WsMessage::server(
        uuid::Uuid::new_v4().to_string(),
        WsMessageType::Event,
        payload,
    );
    serde_json::to_string(&msg).ok()
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, filter: &mut FeedFilter) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error(String::new(), 400, "malformed JSON"))
            .ok();
    };

    let ack = match serde_json::from_value::<WsCommand>(msg.payload) {
        Ok(WsCommand::Subscribe { event_ids }) => filter.watch(&event_ids),
        Ok(WsCommand::Unsubscribe { event_ids }) => filter.unwatch(&event_ids),
        Err(_) => {
            return serde_json::to_string(&WsMessage::error(msg.id, 404, "unknown command")).ok();
        }
    };
    tracing::debug!(count = ack.count, wildcard = ack.wildcard, "ws filter updated");
    let payload = serde_json::to_value(&ack).ok()?;
    serde_json::to_string(&WsMessage::server(msg.id, WsMessageType::Response, payload)).ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::EventId;

    fn command(payload: serde_json::Value) -> String {
        let msg = WsMessage {
            id: "c1".to_string(),
            msg_type: WsMessageType::Command,
            timestamp: chrono::Utc::now(),
            payload,
        };
        let Ok(text) = serde_json::to_string(&msg) else {
            panic!("serialization failed");
        };
        text
    }

    fn reply(text: &str, filter: &mut FeedFilter) -> serde_json::Value {
        let Some(json) = handle_text_message(text, filter) else {
            panic!("expected a reply");
        };
        let Ok(value) = serde_json::from_str(&json) else {
            panic!("reply is not JSON");
        };
        value
    }

    fn regenerated(id: i64) -> CheckInEvent {
        CheckInEvent::CodeRegenerated {
            event_id: EventId::new(id),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn subscribe_then_unsubscribe() {
        let mut filter = FeedFilter::default();
        let resp = reply(
            &command(serde_json::json!({ "command": "subscribe", "event_ids": [5, "6"] })),
            &mut filter,
        );
        assert_eq!(resp["type"], "response");
        assert_eq!(resp["id"], "c1");
        assert_eq!(resp["payload"]["changed"], serde_json::json!([5, 6]));
        assert!(filter.admits(&regenerated(5)));

        let resp = reply(
            &command(serde_json::json!({ "command": "unsubscribe", "event_ids": [5] })),
            &mut filter,
        );
        assert_eq!(resp["payload"]["count"], 1);
        assert!(!filter.admits(&regenerated(5)));
    }

    #[test]
    fn malformed_json_gets_error() {
        let mut filter = FeedFilter::default();
        let resp = reply("{not json", &mut filter);
        assert_eq!(resp["type"], "error");
        assert_eq!(resp["payload"]["code"], 400);
    }

    #[test]
    fn unknown_command_gets_error() {
        let mut filter = FeedFilter::default();
        let resp = reply(
            &command(serde_json::json!({ "command": "check_in" })),
            &mut filter,
        );
        assert_eq!(resp["payload"]["code"], 404);
    }

    #[test]
    fn event_frame_never_contains_codes() {
        let Some(frame) = event_frame(&regenerated(2)) else {
            panic!("frame expected");
        };
        assert!(frame.contains("code_regenerated"));
        assert!(!frame.contains("qr_code"));
    }
}
