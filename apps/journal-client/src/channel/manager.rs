//! Live Notification Channel
//!
//! Supervises the persistent WebSocket to the journal backend: joins the
//! authenticated user's notification room, decodes pushes into a typed
//! event stream, and reconnects on failure within a bounded fixed-delay
//! budget. After the budget is exhausted the channel stays disconnected
//! until reopened.
//!
//! The channel is opened only once the request gateway has confirmed the
//! backend reachable at least once, so a cold start never burns the retry
//! budget against a backend that is simply not up yet.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use super::codec::{encode_join, encode_leave, parse_server_frame};
use super::retry::RetryPolicy;
use super::types::{ChannelError, ChannelState, NotificationEvent, ServerFrame};
use crate::config::ChannelSettings;
use crate::session::SessionStore;

/// Channel capacity for notification events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Poll interval while waiting for first confirmed backend reachability.
const REACHABILITY_POLL: Duration = Duration::from_millis(200);

/// Supervised push connection for live notifications.
pub struct NotificationChannel {
    /// Channel settings.
    config: ChannelSettings,
    /// Session the join is keyed by.
    session: SessionStore,
    /// Reachability flag shared with the request gateway.
    reachable: Arc<AtomicBool>,
    /// Current connection state.
    state: Arc<RwLock<ChannelState>>,
    /// Event sender.
    event_tx: broadcast::Sender<NotificationEvent>,
    /// Cancellation token for teardown.
    shutdown: CancellationToken,
}

impl NotificationChannel {
    /// Create a new channel. Does not connect until [`open`](Self::open).
    #[must_use]
    pub fn new(config: ChannelSettings, session: SessionStore, reachable: Arc<AtomicBool>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            session,
            reachable,
            state: Arc::new(RwLock::new(ChannelState::Disconnected)),
            event_tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Open the channel.
    ///
    /// Spawns a background task that waits for backend reachability, then
    /// maintains the connection. A no-op when no session exists.
    pub fn open(&self) {
        let Some(user_id) = self.session.user_id() else {
            tracing::warn!("Notification channel not opened: no session");
            return;
        };

        let config = self.config.clone();
        let reachable = Arc::clone(&self.reachable);
        let state = Arc::clone(&self.state);
        let event_tx = self.event_tx.clone();
        let shutdown = self.shutdown.clone();
        let logout = self.session.logout_signals();

        tokio::spawn(async move {
            run_channel(config, user_id, reachable, state, event_tx, shutdown, logout).await;
        });
    }

    /// Close the channel. Idempotent; the connection task sends a leave
    /// frame before closing the socket.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Get a receiver for channel events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<NotificationEvent> {
        self.event_tx.subscribe()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    /// Whether the channel is joined and receiving pushes.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.state.read().is_joined()
    }
}

/// Run the connection loop with bounded fixed-delay reconnection.
async fn run_channel(
    config: ChannelSettings,
    user_id: i64,
    reachable: Arc<AtomicBool>,
    state: Arc<RwLock<ChannelState>>,
    event_tx: broadcast::Sender<NotificationEvent>,
    shutdown: CancellationToken,
    mut logout: watch::Receiver<u64>,
) {
    // Gate on the gateway having reached the backend at least once.
    while !reachable.load(Ordering::Relaxed) {
        tokio::select! {
            () = tokio::time::sleep(REACHABILITY_POLL) => {}
            () = shutdown.cancelled() => return,
        }
    }

    let mut retry = RetryPolicy::new(&config);

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        *state.write() = ChannelState::Connecting;

        match connect_and_run(
            &config, user_id, &state, &event_tx, &mut retry, &shutdown, &mut logout,
        )
        .await
        {
            Ok(()) => {
                tracing::info!("Notification channel closed");
                let _ = event_tx.send(NotificationEvent::Disconnected);
                break;
            }
            Err(e) => {
                tracing::warn!("Notification channel error: {e}");
                *state.write() = ChannelState::Disconnected;
                let _ = event_tx.send(NotificationEvent::Disconnected);

                if let Some(delay) = retry.next_delay() {
                    tracing::info!(
                        delay_ms = delay.as_millis(),
                        attempt = retry.current_attempt(),
                        "Reconnecting notification channel"
                    );

                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = shutdown.cancelled() => break,
                    }
                } else {
                    tracing::error!("Notification channel reconnection attempts exhausted");
                    break;
                }
            }
        }
    }

    *state.write() = ChannelState::Disconnected;
}

/// Connect, join the user's room, and pump frames until teardown.
///
/// Returns `Ok` only on client-initiated teardown (close or logout); any
/// server-side close or transport failure is an error so the outer loop
/// reconnects.
async fn connect_and_run(
    config: &ChannelSettings,
    user_id: i64,
    state: &Arc<RwLock<ChannelState>>,
    event_tx: &broadcast::Sender<NotificationEvent>,
    retry: &mut RetryPolicy,
    shutdown: &CancellationToken,
    logout: &mut watch::Receiver<u64>,
) -> Result<(), ChannelError> {
    tracing::info!(url = %config.url, "Connecting notification channel");

    let (ws_stream, _) =
        connect_async(config.url.as_str())
            .await
            .map_err(|e| ChannelError::ConnectionFailed {
                message: e.to_string(),
            })?;

    *state.write() = ChannelState::Connected;
    let _ = event_tx.send(NotificationEvent::Connected);

    let (mut write, mut read) = ws_stream.split();

    write
        .send(Message::Text(encode_join(user_id).into()))
        .await
        .map_err(|e| ChannelError::SendFailed {
            message: e.to_string(),
        })?;

    // Wait for the join acknowledgement; pushes racing ahead of the ack are
    // forwarded rather than dropped.
    timeout(config.join_timeout, async {
        loop {
            let msg = read
                .next()
                .await
                .ok_or_else(|| ChannelError::ConnectionClosed {
                    reason: "stream ended during join".to_string(),
                })?
                .map_err(|e| ChannelError::ConnectionClosed {
                    reason: e.to_string(),
                })?;

            if let Message::Text(text) = msg {
                match parse_server_frame(&text) {
                    Some(ServerFrame::Joined) => return Ok(()),
                    Some(frame) => forward_frame(frame, event_tx),
                    None => {}
                }
            }
        }
    })
    .await
    .map_err(|_| ChannelError::Timeout {
        operation: "join acknowledgement".to_string(),
    })??;

    retry.reset();
    *state.write() = ChannelState::Joined;
    tracing::info!(user_id, "Notification channel joined");
    let _ = event_tx.send(NotificationEvent::Joined);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(frame) = parse_server_frame(&text) {
                            forward_frame(frame, event_tx);
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        return Err(ChannelError::ConnectionClosed {
                            reason: "server closed the connection".to_string(),
                        });
                    }
                    Some(Err(e)) => {
                        return Err(ChannelError::ConnectionClosed {
                            reason: e.to_string(),
                        });
                    }
                    None => {
                        return Err(ChannelError::ConnectionClosed {
                            reason: "stream ended".to_string(),
                        });
                    }
                    _ => {}
                }
            }
            () = shutdown.cancelled() => {
                tracing::info!("Notification channel teardown requested");
                leave_and_close(&mut write, user_id).await;
                return Ok(());
            }
            _ = logout.changed() => {
                tracing::info!("Notification channel leaving after logout");
                leave_and_close(&mut write, user_id).await;
                return Ok(());
            }
        }
    }
}

/// Map a decoded server frame onto the event stream.
fn forward_frame(frame: ServerFrame, event_tx: &broadcast::Sender<NotificationEvent>) {
    let event = match frame {
        // A re-sent ack after the handshake is harmless; subscribers treat
        // every Joined as "take a fresh snapshot".
        ServerFrame::Joined => NotificationEvent::Joined,
        ServerFrame::NewNotification(n) => NotificationEvent::NewNotification(n),
        ServerFrame::UnreadCount(count) => NotificationEvent::UnreadCount(count),
    };
    let _ = event_tx.send(event);
}

/// Send the leave frame and close the socket. Failures are ignored; the
/// socket is going away either way.
async fn leave_and_close<S>(write: &mut S, user_id: i64)
where
    S: SinkExt<Message> + Unpin,
{
    let _ = write.send(Message::Text(encode_leave(user_id).into())).await;
    let _ = write.send(Message::Close(None)).await;
}
