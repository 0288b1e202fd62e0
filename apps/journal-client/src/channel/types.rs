//! Notification Channel Types

use serde::Deserialize;

use crate::notifications::Notification;

/// Connection state of the notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Not connected.
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// Socket open, join not yet acknowledged.
    Connected,
    /// Join acknowledged; pushes are flowing.
    Joined,
}

impl ChannelState {
    /// Whether the channel is joined and receiving pushes.
    #[must_use]
    pub const fn is_joined(&self) -> bool {
        matches!(self, Self::Joined)
    }
}

/// Events emitted by the notification channel.
///
/// Consumed once by the notification feed; transient, never persisted.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// Socket opened; join not yet acknowledged.
    Connected,
    /// Join acknowledged by the backend. Subscribers should fetch a fresh
    /// REST snapshot so state never relies on push alone from a cold start.
    Joined,
    /// A new notification was pushed. Additive; arrives unread.
    NewNotification(Notification),
    /// Authoritative unread count from the backend (cross-device sync).
    UnreadCount(u64),
    /// Connection lost or closed.
    Disconnected,
}

/// One decoded server-to-client frame.
#[derive(Debug, Clone)]
pub enum ServerFrame {
    /// Join acknowledgement.
    Joined,
    /// Pushed notification.
    NewNotification(Notification),
    /// Authoritative unread count.
    UnreadCount(u64),
}

/// Raw wire frame: `{"event": <name>, "data": <payload>}` in both
/// directions.
#[derive(Debug, Deserialize)]
pub(crate) struct WireFrame {
    /// Event name.
    pub event: String,
    /// Event payload; shape depends on the event.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Notification channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Connection attempt failed.
    #[error("channel connection failed: {message}")]
    ConnectionFailed {
        /// Error details.
        message: String,
    },

    /// Sending a frame failed.
    #[error("channel send failed: {message}")]
    SendFailed {
        /// Error details.
        message: String,
    },

    /// Connection closed unexpectedly.
    #[error("channel closed: {reason}")]
    ConnectionClosed {
        /// Close reason.
        reason: String,
    },

    /// An operation timed out.
    #[error("channel timeout during {operation}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_state_joined() {
        assert!(ChannelState::Joined.is_joined());
        assert!(!ChannelState::Connected.is_joined());
        assert!(!ChannelState::Connecting.is_joined());
        assert!(!ChannelState::Disconnected.is_joined());
    }

    #[test]
    fn channel_error_display() {
        let err = ChannelError::Timeout {
            operation: "join acknowledgement".to_string(),
        };
        assert_eq!(err.to_string(), "channel timeout during join acknowledgement");
    }
}
