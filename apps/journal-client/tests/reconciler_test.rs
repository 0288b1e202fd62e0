//! Integration tests for snapshot/push reconciliation and optimistic
//! read-state updates against a mock backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use journal_client::config::{ClientConfig, RequestSettings};
use journal_client::notifications::RECENT_LIMIT;
use journal_client::{
    Notification, NotificationFeed, NotificationKind, RequestGateway, Session, SessionStore,
    UserProfile,
};

fn logged_in_store() -> SessionStore {
    let store = SessionStore::new();
    store.set(Session {
        token: "tok".to_string(),
        user: UserProfile {
            id: 7,
            email: "trader@example.com".to_string(),
            first_name: "Ava".to_string(),
            last_name: "Nguyen".to_string(),
            avatar_url: None,
        },
    });
    store
}

fn feed_against(server: &MockServer) -> NotificationFeed {
    let config = ClientConfig {
        request: RequestSettings {
            base_url: server.uri(),
            ..Default::default()
        },
        ..Default::default()
    };
    let gateway = RequestGateway::new(&config, logged_in_store()).unwrap();
    NotificationFeed::new(gateway)
}

fn pushed(id: i64, minute: u32) -> Notification {
    Notification {
        id,
        kind: NotificationKind::Alert,
        title: format!("n{id}"),
        message: "pushed".to_string(),
        is_read: false,
        created_at: chrono::DateTime::parse_from_rfc3339(&format!(
            "2025-03-14T10:{minute:02}:00Z"
        ))
        .unwrap()
        .with_timezone(&chrono::Utc),
        link: None,
    }
}

async fn mount_snapshot(server: &MockServer, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_json(serde_json::json!({
                    "items": [
                        {
                            "id": 101,
                            "type": "trade",
                            "title": "Trade logged",
                            "message": "MSFT entry recorded",
                            "is_read": false,
                            "created_at": "2025-03-14T09:31:00Z"
                        },
                        {
                            "id": 100,
                            "type": "system",
                            "title": "Welcome",
                            "message": "Journal ready",
                            "is_read": true,
                            "created_at": "2025-03-14T09:30:00Z"
                        }
                    ]
                })),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/unread-count"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"unread_count": 4})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn push_during_snapshot_flight_lands_exactly_once() {
    let server = MockServer::start().await;
    mount_snapshot(&server, Duration::from_millis(300)).await;

    let feed = feed_against(&server);

    let refresh = tokio::spawn({
        let feed = feed.clone();
        async move { feed.refresh().await }
    });

    // The push arrives while the snapshot round trip is in flight.
    tokio::time::sleep(Duration::from_millis(50)).await;
    feed.apply_push(pushed(102, 0));

    refresh.await.unwrap().unwrap();

    let state = feed.state();
    assert_eq!(
        state.recent.iter().map(|n| n.id).collect::<Vec<_>>(),
        vec![102, 101, 100]
    );
    // Snapshot baseline plus exactly one for the in-flight push.
    assert_eq!(state.unread_count, 5);
}

#[tokio::test]
async fn push_already_in_snapshot_is_not_double_counted() {
    let server = MockServer::start().await;
    mount_snapshot(&server, Duration::from_millis(300)).await;

    let feed = feed_against(&server);

    let refresh = tokio::spawn({
        let feed = feed.clone();
        async move { feed.refresh().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    // Id 101 is already part of the snapshot the server is returning.
    feed.apply_push(pushed(101, 0));

    refresh.await.unwrap().unwrap();

    let state = feed.state();
    assert_eq!(
        state.recent.iter().map(|n| n.id).collect::<Vec<_>>(),
        vec![101, 100]
    );
    assert_eq!(state.unread_count, 4);
}

#[tokio::test]
async fn recent_list_never_exceeds_cap_after_snapshot_and_pushes() {
    let server = MockServer::start().await;
    mount_snapshot(&server, Duration::ZERO).await;

    let feed = feed_against(&server);
    feed.refresh().await.unwrap();

    for i in 0..6 {
        feed.apply_push(pushed(200 + i, u32::try_from(i).unwrap()));
    }

    let state = feed.state();
    assert_eq!(state.recent.len(), RECENT_LIMIT);
    assert!(
        state
            .recent
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at)
    );
}

#[tokio::test]
async fn mark_read_is_optimistic_and_floored() {
    let server = MockServer::start().await;
    mount_snapshot(&server, Duration::ZERO).await;

    Mock::given(method("PUT"))
        .and(path("/api/notifications/101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let feed = feed_against(&server);
    feed.refresh().await.unwrap();
    assert_eq!(feed.unread_count(), 4);

    feed.mark_read(101).await;
    assert_eq!(feed.unread_count(), 3);
    assert!(feed.state().recent.iter().find(|n| n.id == 101).unwrap().is_read);

    // A second mark of the same item must not decrement again.
    feed.mark_read(101).await;
    assert_eq!(feed.unread_count(), 3);
}

#[tokio::test]
async fn mark_read_keeps_optimistic_state_on_server_failure() {
    let server = MockServer::start().await;
    mount_snapshot(&server, Duration::ZERO).await;

    Mock::given(method("PUT"))
        .and(path("/api/notifications/101"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let feed = feed_against(&server);
    feed.refresh().await.unwrap();

    // No rollback path: the optimistic flip stands until the next snapshot.
    feed.mark_read(101).await;
    assert_eq!(feed.unread_count(), 3);
}

#[tokio::test]
async fn mark_all_read_zeroes_count() {
    let server = MockServer::start().await;
    mount_snapshot(&server, Duration::ZERO).await;

    Mock::given(method("POST"))
        .and(path("/api/notifications/mark-all-read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed_against(&server);
    feed.refresh().await.unwrap();

    feed.mark_all_read().await;

    let state = feed.state();
    assert_eq!(state.unread_count, 0);
    assert!(state.recent.iter().all(|n| n.is_read));
}

#[tokio::test]
async fn delete_drops_item_and_adjusts_count() {
    let server = MockServer::start().await;
    mount_snapshot(&server, Duration::ZERO).await;

    Mock::given(method("DELETE"))
        .and(path("/api/notifications/101"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed_against(&server);
    feed.refresh().await.unwrap();

    feed.delete(101).await.unwrap();

    let state = feed.state();
    assert!(state.recent.iter().all(|n| n.id != 101));
    assert_eq!(state.unread_count, 3);
}
