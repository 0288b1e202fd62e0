//! Notification Channel Frame Codec
//!
//! Both directions carry JSON frames of the shape
//! `{"event": <name>, "data": <payload>}`. The client emits `join` and
//! `leave` keyed by user id; the server emits `joined`, `new_notification`
//! and `unread_count`. Unknown events are ignored so the backend can add
//! event types without breaking older clients.

use serde::Deserialize;

use super::types::{ServerFrame, WireFrame};
use crate::notifications::Notification;

/// Payload of an `unread_count` frame.
#[derive(Debug, Deserialize)]
struct UnreadCountData {
    count: u64,
}

/// Encode a `join` frame for the given user.
#[must_use]
pub fn encode_join(user_id: i64) -> String {
    serde_json::json!({
        "event": "join",
        "data": { "user_id": user_id }
    })
    .to_string()
}

/// Encode a `leave` frame for the given user.
#[must_use]
pub fn encode_leave(user_id: i64) -> String {
    serde_json::json!({
        "event": "leave",
        "data": { "user_id": user_id }
    })
    .to_string()
}

/// Decode one server frame.
///
/// Returns `None` for malformed frames and for event types this client does
/// not consume.
#[must_use]
pub fn parse_server_frame(text: &str) -> Option<ServerFrame> {
    let frame: WireFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding malformed channel frame");
            return None;
        }
    };

    match frame.event.as_str() {
        "joined" => Some(ServerFrame::Joined),
        "new_notification" => match serde_json::from_value::<Notification>(frame.data) {
            Ok(notification) => Some(ServerFrame::NewNotification(notification)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable notification push");
                None
            }
        },
        "unread_count" => match serde_json::from_value::<UnreadCountData>(frame.data) {
            Ok(data) => Some(ServerFrame::UnreadCount(data.count)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable unread count push");
                None
            }
        },
        other => {
            tracing::debug!(event = other, "Ignoring unhandled channel event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationKind;

    #[test]
    fn encodes_join_and_leave() {
        let join: serde_json::Value = serde_json::from_str(&encode_join(42)).unwrap();
        assert_eq!(join["event"], "join");
        assert_eq!(join["data"]["user_id"], 42);

        let leave: serde_json::Value = serde_json::from_str(&encode_leave(42)).unwrap();
        assert_eq!(leave["event"], "leave");
        assert_eq!(leave["data"]["user_id"], 42);
    }

    #[test]
    fn parses_joined() {
        let frame = parse_server_frame(r#"{"event":"joined","data":{"user_id":42}}"#);
        assert!(matches!(frame, Some(ServerFrame::Joined)));
    }

    #[test]
    fn parses_new_notification() {
        let text = r#"{
            "event": "new_notification",
            "data": {
                "id": 9,
                "type": "trade",
                "title": "Trade logged",
                "message": "AAPL entry recorded",
                "link": "/trade-logs/9",
                "created_at": "2025-03-14T09:30:00Z"
            }
        }"#;

        let Some(ServerFrame::NewNotification(n)) = parse_server_frame(text) else {
            panic!("expected a notification frame");
        };
        assert_eq!(n.id, 9);
        assert_eq!(n.kind, NotificationKind::Trade);
        assert_eq!(n.title, "Trade logged");
        assert_eq!(n.link.as_deref(), Some("/trade-logs/9"));
        assert!(!n.is_read);
    }

    #[test]
    fn parses_unread_count() {
        let frame = parse_server_frame(r#"{"event":"unread_count","data":{"count":3}}"#);
        assert!(matches!(frame, Some(ServerFrame::UnreadCount(3))));
    }

    #[test]
    fn ignores_unknown_event() {
        assert!(parse_server_frame(r#"{"event":"presence","data":{}}"#).is_none());
    }

    #[test]
    fn ignores_malformed_frame() {
        assert!(parse_server_frame("not json").is_none());
        assert!(parse_server_frame(r#"{"data":{}}"#).is_none());
    }
}
