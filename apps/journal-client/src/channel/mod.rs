//! Live Notification Channel
//!
//! Persistent WebSocket connection to the journal backend's notification
//! room, with a typed event stream and bounded fixed-delay reconnection.

pub mod codec;
pub mod manager;
pub mod retry;
pub mod types;

pub use manager::NotificationChannel;
pub use retry::RetryPolicy;
pub use types::{ChannelError, ChannelState, NotificationEvent, ServerFrame};
