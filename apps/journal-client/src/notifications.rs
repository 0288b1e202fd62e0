//! Notification Feed
//!
//! Single source of truth for the unread count and the recent-notification
//! list. Merges point-in-time REST snapshots with pushed events from the
//! live channel without duplication or count drift.
//!
//! The unread count is never derived from the length of the cached list:
//! the cache is capped at the five most recent items while the server may
//! hold many more unread ones. The count moves only by explicit rules (push
//! +1, mark-read -1 floored at zero, authoritative overwrites).
//!
//! Snapshot fetches and pushes race. Each push takes a monotonic sequence
//! number; a snapshot records the sequence before its fetch and, on apply,
//! re-prepends pushes that arrived during the round trip, so a pushed item
//! lands exactly once and the count never goes backwards.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::alerts::AlertGate;
use crate::channel::{NotificationChannel, NotificationEvent};
use crate::error::ApiError;
use crate::gateway::RequestGateway;

/// Maximum cached recent notifications.
pub const RECENT_LIMIT: usize = 5;

/// Pushes remembered for reconciling against an in-flight snapshot.
const PUSH_MEMORY: usize = 16;

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Trade log activity.
    Trade,
    /// Analysis activity.
    Analysis,
    /// Strategy activity.
    Strategy,
    /// Price or rule alert.
    Alert,
    /// System message.
    System,
}

/// One notification. Identity is `id`; `is_read` is the only field the
/// client may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Server-assigned id.
    pub id: i64,
    /// Category.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Whether the notification has been read. Pushes arrive unread.
    #[serde(default)]
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optional in-app route.
    #[serde(default)]
    pub link: Option<String>,
}

/// Snapshot of the feed for rendering.
#[derive(Debug, Clone)]
pub struct NotificationState {
    /// Most recent notifications, newest first, at most [`RECENT_LIMIT`].
    pub recent: Vec<Notification>,
    /// Unread count across all notifications, not just cached ones.
    pub unread_count: u64,
}

#[derive(Debug, Deserialize)]
struct NotificationPage {
    items: Vec<Notification>,
}

#[derive(Debug, Deserialize)]
struct UnreadCountBody {
    unread_count: u64,
}

#[derive(Default)]
struct FeedState {
    recent: Vec<Notification>,
    unread_count: u64,
    /// Monotonic sequence of the most recent push.
    push_seq: u64,
    /// Recent pushes with their sequence numbers, oldest first.
    recent_pushes: VecDeque<(u64, Notification)>,
}

struct Inner {
    gateway: RequestGateway,
    state: RwLock<FeedState>,
}

/// Shared handle to the notification feed.
///
/// Cheap to clone; all clones observe the same state.
#[derive(Clone)]
pub struct NotificationFeed {
    inner: Arc<Inner>,
}

impl NotificationFeed {
    /// Create a feed over the request gateway.
    #[must_use]
    pub fn new(gateway: RequestGateway) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                state: RwLock::new(FeedState::default()),
            }),
        }
    }

    /// Snapshot the current feed state.
    #[must_use]
    pub fn state(&self) -> NotificationState {
        let state = self.inner.state.read();
        NotificationState {
            recent: state.recent.clone(),
            unread_count: state.unread_count,
        }
    }

    /// Current unread count.
    #[must_use]
    pub fn unread_count(&self) -> u64 {
        self.inner.state.read().unread_count
    }

    /// Fetch a fresh snapshot: the newest [`RECENT_LIMIT`] notifications
    /// plus the authoritative unread count.
    ///
    /// Pushes that arrive during the round trip are folded back in on
    /// apply, so a concurrent push is reflected exactly once and counted
    /// exactly once on top of the snapshot's baseline.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when either fetch fails; the cached state
    /// is left untouched.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let seq_before = self.inner.state.read().push_seq;

        let page: NotificationPage = self
            .inner
            .gateway
            .get_with_query(
                "/api/notifications",
                &[
                    ("per_page", RECENT_LIMIT.to_string()),
                    ("sort_order", "desc".to_string()),
                ],
            )
            .await?;
        let count: UnreadCountBody = self
            .inner
            .gateway
            .get("/api/notifications/unread-count")
            .await?;

        let mut state = self.inner.state.write();

        let snapshot_ids: Vec<i64> = page.items.iter().map(|n| n.id).collect();
        let late: Vec<Notification> = state
            .recent_pushes
            .iter()
            .filter(|(seq, n)| *seq > seq_before && !snapshot_ids.contains(&n.id))
            .map(|(_, n)| n.clone())
            .collect();

        let mut recent = Vec::with_capacity(RECENT_LIMIT);
        // Late pushes are newer than anything in the snapshot.
        recent.extend(late.iter().rev().cloned());
        recent.extend(page.items);
        recent.truncate(RECENT_LIMIT);

        state.recent = recent;
        state.unread_count = count.unread_count + late.len() as u64;
        state.recent_pushes.retain(|(seq, _)| *seq > seq_before);

        tracing::debug!(
            unread = state.unread_count,
            cached = state.recent.len(),
            "Notification snapshot applied"
        );
        Ok(())
    }

    /// Apply a pushed notification: prepend, truncate, count up by one.
    pub fn apply_push(&self, notification: Notification) {
        let mut state = self.inner.state.write();
        state.push_seq += 1;
        let seq = state.push_seq;
        state.recent_pushes.push_back((seq, notification.clone()));
        if state.recent_pushes.len() > PUSH_MEMORY {
            state.recent_pushes.pop_front();
        }

        state.recent.retain(|n| n.id != notification.id);
        state.recent.insert(0, notification);
        state.recent.truncate(RECENT_LIMIT);
        state.unread_count += 1;
    }

    /// Overwrite the unread count with an authoritative server value.
    pub fn set_unread_count(&self, count: u64) {
        self.inner.state.write().unread_count = count;
    }

    /// Mark one notification read.
    ///
    /// The cached item flips and the count drops (at most one, floored at
    /// zero) before the server round trip; a failed round trip is logged
    /// and accepted as drift until the next snapshot.
    pub async fn mark_read(&self, id: i64) {
        {
            let mut state = self.inner.state.write();
            let flipped = state
                .recent
                .iter_mut()
                .find(|n| n.id == id && !n.is_read)
                .map(|n| n.is_read = true)
                .is_some();
            if flipped {
                state.unread_count = state.unread_count.saturating_sub(1);
            }
        }

        let result: Result<serde_json::Value, ApiError> = self
            .inner
            .gateway
            .put(&format!("/api/notifications/{id}"), &serde_json::json!({}))
            .await;
        if let Err(e) = result {
            tracing::warn!(id, error = %e, "Failed to mark notification read");
        }
    }

    /// Mark every notification read.
    ///
    /// Optimistically flips all cached items and zeroes the count; the
    /// server call is fire-and-forget once dispatched.
    pub async fn mark_all_read(&self) {
        {
            let mut state = self.inner.state.write();
            for n in &mut state.recent {
                n.is_read = true;
            }
            state.unread_count = 0;
        }

        let result: Result<serde_json::Value, ApiError> = self
            .inner
            .gateway
            .post_empty("/api/notifications/mark-all-read")
            .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to mark all notifications read");
        }
    }

    /// Delete a notification on the server, then drop it from the cache.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the delete fails; the cache is left
    /// untouched.
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.inner
            .gateway
            .delete(&format!("/api/notifications/{id}"))
            .await?;

        let mut state = self.inner.state.write();
        if let Some(pos) = state.recent.iter().position(|n| n.id == id) {
            let removed = state.recent.remove(pos);
            if !removed.is_read {
                state.unread_count = state.unread_count.saturating_sub(1);
            }
        }
        state.recent_pushes.retain(|(_, n)| n.id != id);
        Ok(())
    }

    /// Tear the feed down on logout.
    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        state.recent.clear();
        state.unread_count = 0;
        state.recent_pushes.clear();
    }

    /// Spawn a task that drives this feed from the channel's event stream.
    ///
    /// Every `Joined` triggers exactly one snapshot fetch; pushes are
    /// merged and surfaced through the alert gate. The task ends when the
    /// channel closes or the session logs out.
    pub fn attach(&self, channel: &NotificationChannel, alerts: AlertGate) {
        let feed = self.clone();
        let mut events = channel.events();
        let mut logout = self.inner.gateway.session().logout_signals();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(NotificationEvent::Joined) => {
                            if let Err(e) = feed.refresh().await {
                                tracing::warn!(error = %e, "Snapshot fetch after join failed");
                            }
                        }
                        Ok(NotificationEvent::NewNotification(n)) => {
                            feed.apply_push(n.clone());
                            alerts.deliver(&n).await;
                        }
                        Ok(NotificationEvent::UnreadCount(count)) => {
                            feed.set_unread_count(count);
                        }
                        Ok(NotificationEvent::Connected | NotificationEvent::Disconnected) => {}
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "Notification events lagged; resyncing");
                            if let Err(e) = feed.refresh().await {
                                tracing::warn!(error = %e, "Resync snapshot fetch failed");
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = logout.changed() => {
                        feed.clear();
                        break;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn notification(id: i64, minute: u32) -> Notification {
        Notification {
            id,
            kind: NotificationKind::Trade,
            title: format!("n{id}"),
            message: "msg".to_string(),
            is_read: false,
            created_at: chrono::DateTime::parse_from_rfc3339(&format!(
                "2025-03-14T09:{minute:02}:00Z"
            ))
            .unwrap()
            .with_timezone(&Utc),
            link: None,
        }
    }

    fn bare_feed() -> NotificationFeed {
        let config = crate::config::ClientConfig::default();
        let gateway =
            RequestGateway::new(&config, crate::session::SessionStore::new()).unwrap();
        NotificationFeed::new(gateway)
    }

    #[test]
    fn push_prepends_and_truncates() {
        let feed = bare_feed();

        for i in 0..8 {
            feed.apply_push(notification(i, u32::try_from(i).unwrap()));
        }

        let state = feed.state();
        assert_eq!(state.recent.len(), RECENT_LIMIT);
        assert_eq!(
            state.recent.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![7, 6, 5, 4, 3]
        );
        assert_eq!(state.unread_count, 8);
    }

    #[test]
    fn duplicate_push_kept_once() {
        let feed = bare_feed();
        feed.apply_push(notification(1, 0));
        feed.apply_push(notification(1, 1));

        let state = feed.state();
        assert_eq!(state.recent.len(), 1);
        // Count is additive per push; the authoritative overwrite corrects
        // any server-side disagreement.
        assert_eq!(state.unread_count, 2);
    }

    #[test]
    fn authoritative_count_overwrites() {
        let feed = bare_feed();
        feed.apply_push(notification(1, 0));
        feed.set_unread_count(12);
        assert_eq!(feed.unread_count(), 12);
    }

    #[test]
    fn clear_resets_state() {
        let feed = bare_feed();
        feed.apply_push(notification(1, 0));
        feed.clear();

        let state = feed.state();
        assert!(state.recent.is_empty());
        assert_eq!(state.unread_count, 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(i64),
        SetCount(u64),
        LocalMarkRead(i64),
        LocalMarkAllRead,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0_i64..50).prop_map(Op::Push),
            (0_u64..100).prop_map(Op::SetCount),
            (0_i64..50).prop_map(Op::LocalMarkRead),
            Just(Op::LocalMarkAllRead),
        ]
    }

    proptest! {
        /// The cache never exceeds its cap, stays newest-first, and the
        /// count follows the explicit movement rules without underflow.
        #[test]
        fn count_and_cache_invariants(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let feed = bare_feed();
            let mut minute = 0_u32;
            let mut model: i64 = 0;

            for op in ops {
                match op {
                    Op::Push(id) => {
                        feed.apply_push(notification(id, minute));
                        minute += 1;
                        model += 1;
                    }
                    Op::SetCount(n) => {
                        feed.set_unread_count(n);
                        model = i64::try_from(n).unwrap();
                    }
                    Op::LocalMarkRead(id) => {
                        // Mirror only the optimistic half of mark_read.
                        let mut state = feed.inner.state.write();
                        let flipped = state
                            .recent
                            .iter_mut()
                            .find(|n| n.id == id && !n.is_read)
                            .map(|n| n.is_read = true)
                            .is_some();
                        if flipped {
                            state.unread_count = state.unread_count.saturating_sub(1);
                            model = (model - 1).max(0);
                        }
                    }
                    Op::LocalMarkAllRead => {
                        let mut state = feed.inner.state.write();
                        for n in &mut state.recent {
                            n.is_read = true;
                        }
                        state.unread_count = 0;
                        model = 0;
                    }
                }

                let state = feed.state();
                prop_assert!(state.recent.len() <= RECENT_LIMIT);
                prop_assert!(
                    state
                        .recent
                        .windows(2)
                        .all(|w| w[0].created_at >= w[1].created_at)
                );
                prop_assert_eq!(i64::try_from(state.unread_count).unwrap(), model.max(0));
            }
        }
    }

    #[test]
    fn notification_wire_shape() {
        let json = r#"{
            "id": 3,
            "type": "alert",
            "title": "Price alert",
            "message": "AAPL crossed 200",
            "is_read": true,
            "created_at": "2025-03-14T09:30:00Z",
            "link": "/alerts/3"
        }"#;

        let n: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(n.kind, NotificationKind::Alert);
        assert!(n.is_read);
        assert_eq!(n.link.as_deref(), Some("/alerts/3"));
    }
}
