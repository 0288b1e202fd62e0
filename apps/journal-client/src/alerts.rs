//! Desktop Alert Delivery
//!
//! Port for surfacing a pushed notification outside the dashboard UI.
//! Delivery permission is requested at most once per session, on the first
//! push, never eagerly and never per event.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::notifications::Notification;

/// Host-side alert surface.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Ask the host for permission to show alerts.
    async fn request_permission(&self) -> bool;

    /// Show one alert. Called only after permission was granted.
    async fn show(&self, notification: &Notification);
}

/// Sink that drops every alert. Used when the host has no alert surface.
pub struct NoopAlerts;

#[async_trait]
impl AlertSink for NoopAlerts {
    async fn request_permission(&self) -> bool {
        false
    }

    async fn show(&self, _notification: &Notification) {}
}

/// Sink that logs alerts through `tracing`. Default for the headless
/// binary.
pub struct LogAlerts;

#[async_trait]
impl AlertSink for LogAlerts {
    async fn request_permission(&self) -> bool {
        true
    }

    async fn show(&self, notification: &Notification) {
        tracing::info!(
            id = notification.id,
            title = %notification.title,
            message = %notification.message,
            "Notification alert"
        );
    }
}

/// Wraps a sink with the ask-once permission rule.
#[derive(Clone)]
pub struct AlertGate {
    sink: Arc<dyn AlertSink>,
    permission: Arc<OnceCell<bool>>,
}

impl AlertGate {
    /// Create a gate over a sink.
    #[must_use]
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self {
            sink,
            permission: Arc::new(OnceCell::new()),
        }
    }

    /// Deliver one alert, requesting permission on first use.
    pub async fn deliver(&self, notification: &Notification) {
        let granted = *self
            .permission
            .get_or_init(|| async { self.sink.request_permission().await })
            .await;

        if granted {
            self.sink.show(notification).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        asked: AtomicUsize,
        shown: AtomicUsize,
        grant: bool,
    }

    #[async_trait]
    impl AlertSink for CountingSink {
        async fn request_permission(&self) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.grant
        }

        async fn show(&self, _notification: &Notification) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample() -> Notification {
        Notification {
            id: 1,
            kind: crate::notifications::NotificationKind::System,
            title: "t".to_string(),
            message: "m".to_string(),
            is_read: false,
            created_at: chrono::Utc::now(),
            link: None,
        }
    }

    #[tokio::test]
    async fn asks_permission_once() {
        let sink = Arc::new(CountingSink {
            asked: AtomicUsize::new(0),
            shown: AtomicUsize::new(0),
            grant: true,
        });
        let gate = AlertGate::new(Arc::clone(&sink) as Arc<dyn AlertSink>);

        gate.deliver(&sample()).await;
        gate.deliver(&sample()).await;
        gate.deliver(&sample()).await;

        assert_eq!(sink.asked.load(Ordering::SeqCst), 1);
        assert_eq!(sink.shown.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn denied_permission_suppresses_alerts() {
        let sink = Arc::new(CountingSink {
            asked: AtomicUsize::new(0),
            shown: AtomicUsize::new(0),
            grant: false,
        });
        let gate = AlertGate::new(Arc::clone(&sink) as Arc<dyn AlertSink>);

        gate.deliver(&sample()).await;
        gate.deliver(&sample()).await;

        assert_eq!(sink.asked.load(Ordering::SeqCst), 1);
        assert_eq!(sink.shown.load(Ordering::SeqCst), 0);
    }
}
