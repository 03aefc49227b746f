//! End-to-end message flow tests against a real PostgreSQL database.
//!
//! Set TEST_DATABASE_URL to a database these tests may write to; each
//! test is skipped when it is unset.

use direct_chat_service::error::AppError;
use direct_chat_service::services::{ChatService, MessageService, RelationshipService};
use direct_chat_service::websocket::ConnectionRegistry;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

async fn test_pool() -> Option<Pool<Postgres>> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    direct_chat_service::db::MIGRATOR
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

/// Fresh user-id pair per test so runs never collide.
fn user_pair() -> (i64, i64) {
    let base = chrono::Utc::now().timestamp_micros();
    (base, base + 1)
}

async fn follow(db: &Pool<Postgres>, follower: i64, following: i64) {
    sqlx::query(
        "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(follower)
    .bind(following)
    .execute(db)
    .await
    .expect("seed follow edge");
}

async fn follow_mutually(db: &Pool<Postgres>, a: i64, b: i64) {
    follow(db, a, b).await;
    follow(db, b, a).await;
}

#[tokio::test]
async fn mutual_send_appears_in_both_histories() {
    let Some(db) = test_pool().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let registry = ConnectionRegistry::new();
    let (a, b) = user_pair();
    follow_mutually(&db, a, b).await;

    let first = ChatService::send(&db, &registry, a, b, "first").await.unwrap();
    let second = ChatService::send(&db, &registry, b, a, "second").await.unwrap();
    assert!(second.message_id > first.message_id);

    let from_a = ChatService::history(&db, a, b, 200).await.unwrap();
    let from_b = ChatService::history(&db, b, a, 200).await.unwrap();

    let ids_a: Vec<i64> = from_a.iter().map(|m| m.id).collect();
    let ids_b: Vec<i64> = from_b.iter().map(|m| m.id).collect();
    assert_eq!(ids_a, vec![first.message_id, second.message_id]);
    assert_eq!(ids_a, ids_b);
    assert_eq!(from_a[0].message, "first");
    assert_eq!(from_a[0].sender_id, a);
    assert!(!from_a[0].is_read);
}

#[tokio::test]
async fn one_way_follow_is_forbidden() {
    let Some(db) = test_pool().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let registry = ConnectionRegistry::new();
    let (a, b) = user_pair();
    follow(&db, a, b).await; // a follows b, b does not follow back

    let send_err = ChatService::send(&db, &registry, a, b, "hi").await.unwrap_err();
    assert!(matches!(send_err, AppError::Forbidden));

    let history_err = ChatService::history(&db, a, b, 200).await.unwrap_err();
    assert!(matches!(history_err, AppError::Forbidden));

    assert!(RelationshipService::is_following(&db, a, b).await.unwrap());
    assert!(!RelationshipService::are_mutuals(&db, a, b).await.unwrap());
}

#[tokio::test]
async fn send_without_live_channel_still_persists() {
    let Some(db) = test_pool().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let registry = ConnectionRegistry::new();
    let (a, b) = user_pair();
    follow_mutually(&db, a, b).await;

    let receipt = ChatService::send(&db, &registry, a, b, "offline").await.unwrap();

    let history = ChatService::history(&db, a, b, 200).await.unwrap();
    assert!(history.iter().any(|m| m.id == receipt.message_id));
}

#[tokio::test]
async fn connected_receiver_gets_delivery_frame() {
    let Some(db) = test_pool().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let registry = ConnectionRegistry::new();
    let (a, b) = user_pair();
    follow_mutually(&db, a, b).await;

    let (_conn, mut rx) = registry.register(b);

    ChatService::send(&db, &registry, a, b, "hi").await.unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("delivery within a second")
        .expect("channel open");
    let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(json["sender_id"], a);
    assert_eq!(json["message"], "hi");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn mark_read_is_receiver_only_and_idempotent() {
    let Some(db) = test_pool().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let registry = ConnectionRegistry::new();
    let (a, b) = user_pair();
    follow_mutually(&db, a, b).await;

    let receipt = ChatService::send(&db, &registry, a, b, "read me").await.unwrap();

    // The sender may not mark their own message as read.
    let err = ChatService::mark_read(&db, receipt.message_id, a).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    ChatService::mark_read(&db, receipt.message_id, b).await.unwrap();
    // Second call is an idempotent no-op.
    ChatService::mark_read(&db, receipt.message_id, b).await.unwrap();

    let history = ChatService::history(&db, a, b, 200).await.unwrap();
    let msg = history.iter().find(|m| m.id == receipt.message_id).unwrap();
    assert!(msg.is_read);
}

#[tokio::test]
async fn mark_read_unknown_message_is_not_found() {
    let Some(db) = test_pool().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let (a, _) = user_pair();

    let err = MessageService::mark_read(&db, i64::MAX, a).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn history_orders_by_persist_time_regardless_of_direction() {
    let Some(db) = test_pool().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let registry = ConnectionRegistry::new();
    let (a, b) = user_pair();
    follow_mutually(&db, a, b).await;

    ChatService::send(&db, &registry, a, b, "one").await.unwrap();
    ChatService::send(&db, &registry, b, a, "two").await.unwrap();
    ChatService::send(&db, &registry, a, b, "three").await.unwrap();

    let history = ChatService::history(&db, a, b, 200).await.unwrap();
    let bodies: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(bodies, vec!["one", "two", "three"]);

    let timestamps: Vec<_> = history.iter().map(|m| m.timestamp).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn history_cap_keeps_the_newest_messages() {
    let Some(db) = test_pool().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let registry = ConnectionRegistry::new();
    let (a, b) = user_pair();
    follow_mutually(&db, a, b).await;

    ChatService::send(&db, &registry, a, b, "one").await.unwrap();
    ChatService::send(&db, &registry, b, a, "two").await.unwrap();
    let latest = ChatService::send(&db, &registry, a, b, "three").await.unwrap();

    // Over the cap the oldest rows fall away; the latest send stays
    // visible and ordering is still ascending.
    let history = ChatService::history(&db, a, b, 2).await.unwrap();
    let bodies: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(bodies, vec!["two", "three"]);
    assert_eq!(history.last().map(|m| m.id), Some(latest.message_id));
}
