// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Journal Client - Data Synchronization Library
//!
//! Client-side synchronization and notification layer for the trading
//! journal backend.
//!
//! # Components
//!
//! - **Session Store** ([`session`]): holds the bearer credential and user
//!   identity; idempotent clear with a single logout signal.
//! - **Request Gateway** ([`gateway`]): the one REST dispatch path; attaches
//!   the token, applies the uniform timeout, classifies failures, and tracks
//!   backend reachability.
//! - **Paginated Query Controller** ([`query`]): per-view list state with
//!   debounced search and request-epoch fencing against stale responses.
//! - **Live Notification Channel** ([`channel`]): supervised WebSocket with
//!   join/leave room semantics and bounded fixed-delay reconnection.
//! - **Notification Feed** ([`notifications`]): reconciles REST snapshots
//!   with pushed events into one unread count and recent list.
//!
//! Supporting modules: [`auth`] (login/register), [`resources`] (typed
//! collections), [`alerts`] (desktop alert port), [`config`], [`error`],
//! [`telemetry`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Desktop alert delivery port.
pub mod alerts;

/// Login and registration flow.
pub mod auth;

/// Live notification channel.
pub mod channel;

/// Environment-driven configuration.
pub mod config;

/// Error taxonomy.
pub mod error;

/// Authenticated REST dispatch.
pub mod gateway;

/// Notification feed reconciliation.
pub mod notifications;

/// Paginated list controllers.
pub mod query;

/// Typed journal collections.
pub mod resources;

/// Session credential store.
pub mod session;

/// Tracing initialization for the binary.
pub mod telemetry;

pub use alerts::{AlertGate, AlertSink, LogAlerts, NoopAlerts};
pub use auth::AuthClient;
pub use channel::{ChannelError, ChannelState, NotificationChannel, NotificationEvent};
pub use config::ClientConfig;
pub use error::ApiError;
pub use gateway::RequestGateway;
pub use notifications::{Notification, NotificationFeed, NotificationKind, NotificationState};
pub use query::{ListQuery, PageSource, PageView, PagedQuery, Paginated, SortOrder};
pub use resources::{Analysis, Resource, ResourceClient, Strategy, TradeDirection, TradeLog};
pub use session::{Session, SessionStore, UserProfile};
