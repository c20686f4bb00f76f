//! Notification aggregator integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{FakeSource, TestApp, body_json, comment};
use painel_kernel::notifications::{
    NotificationPoller, NotificationSnapshot, PollerOptions, RefreshMode,
};
use painel_test_utils::pending_comment;

fn seeded_source() -> std::sync::Arc<FakeSource> {
    let source = FakeSource::new();
    source.set_comments(vec![
        comment(pending_comment(1, "Primeiro").created_at("2025-03-01T09:00:00Z")),
        comment(pending_comment(2, "Segundo").created_at("2025-03-01T10:00:00Z")),
    ]);
    source
}

fn ids(snapshot: &NotificationSnapshot) -> Vec<&str> {
    snapshot.notifications.iter().map(|n| n.id.as_str()).collect()
}

async fn post(app: &TestApp, uri: &str) -> axum::response::Response {
    app.request(Request::post(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn test_lists_pending_comments_newest_first() {
    let app = TestApp::with_source(seeded_source(), |_| {}).await;
    app.refresh().await;

    let response = app
        .request(Request::get("/api/notifications").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["unreadCount"], 2);
    assert_eq!(body["loading"], false);
    assert_eq!(body["notifications"][0]["id"], "comment-2");
    assert_eq!(body["notifications"][1]["id"], "comment-1");
    assert_eq!(body["notifications"][0]["type"], "comment");
    assert_eq!(body["notifications"][0]["actionUrl"], "/comentarios");
    assert_eq!(body["notifications"][0]["message"], "\"Segundo\" por Maria");
}

#[tokio::test]
async fn test_mark_as_read_updates_unread_count() {
    let app = TestApp::with_source(seeded_source(), |_| {}).await;
    app.refresh().await;

    let response = post(&app, "/api/notifications/comment-1/read").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let snapshot = app.state.notifications().snapshot();
    assert_eq!(snapshot.unread_count, 1);
    let read: Vec<bool> = snapshot.notifications.iter().map(|n| n.read).collect();
    assert_eq!(read, vec![false, true]);
}

#[tokio::test]
async fn test_mark_unknown_id_changes_nothing() {
    let app = TestApp::with_source(seeded_source(), |_| {}).await;
    app.refresh().await;
    let before = app.state.notifications().snapshot();

    let response = post(&app, "/api/notifications/comment-99/read").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(app.state.notifications().snapshot(), before);
    assert!(!app.state.notifications().mark_as_read("comment-99").await.unwrap());
}

#[tokio::test]
async fn test_replace_mode_resets_read_flags() {
    let app = TestApp::with_source(seeded_source(), |c| {
        c.notification_refresh_mode = RefreshMode::Replace;
    })
    .await;
    app.refresh().await;

    let response = post(&app, "/api/notifications/read-all").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.state.notifications().snapshot().unread_count, 0);

    let response = post(&app, "/api/notifications/refresh").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["unreadCount"], 2);
    assert!(
        body["notifications"]
            .as_array()
            .unwrap()
            .iter()
            .all(|n| n["read"] == false)
    );
}

#[tokio::test]
async fn test_merge_mode_keeps_read_flags() {
    let source = seeded_source();
    let app = TestApp::with_source(source.clone(), |_| {}).await;
    app.refresh().await;
    app.state.notifications().mark_all_as_read().await.unwrap();

    // comment-1 approved elsewhere, comment-3 arrived
    source.set_comments(vec![
        comment(pending_comment(2, "Segundo").created_at("2025-03-01T10:00:00Z")),
        comment(pending_comment(3, "Terceiro").created_at("2025-03-01T11:00:00Z")),
    ]);
    let snapshot = app.state.notifications().refresh().await.unwrap();

    assert_eq!(ids(&snapshot), vec!["comment-3", "comment-2"]);
    assert_eq!(snapshot.unread_count, 1);
    assert!(!snapshot.notifications[0].read);
    assert!(snapshot.notifications[1].read);
}

#[tokio::test]
async fn test_subscribers_see_mutations() {
    let app = TestApp::with_source(seeded_source(), |_| {}).await;
    app.refresh().await;
    let mut snapshots = app.state.notifications().subscribe();
    snapshots.borrow_and_update();

    app.state.notifications().mark_all_as_read().await.unwrap();

    assert!(snapshots.has_changed().unwrap());
    assert_eq!(snapshots.borrow_and_update().unread_count, 0);
}

#[tokio::test]
async fn test_source_failure_clears_everything() {
    let source = seeded_source();
    let app = TestApp::with_source(source.clone(), |_| {}).await;
    app.refresh().await;
    app.state.notifications().mark_as_read("comment-1").await.unwrap();
    assert_eq!(app.state.notifications().snapshot().notifications.len(), 2);

    source.set_failing(true);
    let snapshot = app.state.notifications().refresh().await.unwrap();

    assert!(snapshot.notifications.is_empty());
    assert_eq!(snapshot.unread_count, 0);
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn test_added_notification_is_prepended() {
    let app = TestApp::with_source(seeded_source(), |_| {}).await;
    app.refresh().await;

    let response = app
        .request(
            Request::post("/api/notifications")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "type": "video",
                        "title": "Upload concluído",
                        "message": "aula.mp4 enviado",
                        "actionUrl": "/videos"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert!(created["id"].as_str().unwrap().starts_with("local-"));
    assert_eq!(created["read"], false);

    let snapshot = app.state.notifications().snapshot();
    assert_eq!(snapshot.notifications[0].id, created["id"]);
    assert_eq!(snapshot.unread_count, 3);

    // Survives a merging refresh
    let snapshot = app.state.notifications().refresh().await.unwrap();
    assert_eq!(snapshot.notifications.len(), 3);
    assert!(snapshot.notifications.iter().any(|n| n.id == created["id"]));
}

#[tokio::test]
async fn test_activity_summaries_when_enabled() {
    let app = TestApp::with_source(seeded_source(), |c| c.notification_activity = true).await;

    let snapshot = app.state.notifications().refresh().await.unwrap();

    let ids = ids(&snapshot);
    assert!(ids.contains(&"activity-users"));
    assert!(ids.contains(&"activity-posts"));
    assert!(ids.contains(&"activity-videos"));
    assert_eq!(snapshot.unread_count, 5);
}

#[tokio::test(start_paused = true)]
async fn test_polls_on_interval() {
    let source = FakeSource::new();
    let options = PollerOptions {
        interval: Duration::from_secs(30),
        ..PollerOptions::default()
    };
    let (handle, task) = NotificationPoller::spawn(source.clone(), options, CancellationToken::new());

    // Loads at 0s, 30s, 60s and 90s
    tokio::time::sleep(Duration::from_secs(95)).await;
    assert_eq!(source.calls(), 4);

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_slow_loads_do_not_overlap() {
    let source = FakeSource::new();
    source.set_delay(Duration::from_secs(45));
    let options = PollerOptions {
        interval: Duration::from_secs(30),
        ..PollerOptions::default()
    };
    let (handle, task) = NotificationPoller::spawn(source.clone(), options, CancellationToken::new());

    // 0s starts a load that ends at 45s, so the 30s tick is skipped; 60s
    // starts the next one, which is still running at 90s.
    tokio::time::sleep(Duration::from_secs(95)).await;
    assert_eq!(source.calls(), 2);
    assert!(handle.snapshot().loading);

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_poller() {
    let source = FakeSource::new();
    let cancel = CancellationToken::new();
    let (handle, task) = NotificationPoller::spawn(source, PollerOptions::default(), cancel.clone());

    cancel.cancel();
    task.await.unwrap();

    assert!(handle.refresh().await.is_err());
    assert!(handle.mark_all_as_read().await.is_err());
}
