//! Integration tests for presence, profiles and multi-connection
//! disconnect semantics.

mod common;

use chatterd::error::ChatError;
use chatterd::events::{Scope, ServerEvent};
use chatterd::state::{UserStatus, GENERAL_ROOM_ID};
use common::harness;

#[tokio::test]
async fn user_stays_online_until_last_connection_closes() {
    let h = harness();

    // Alice joins from two devices.
    h.engine.join(GENERAL_ROOM_ID, "1", "c1").await.unwrap();
    h.engine.join(GENERAL_ROOM_ID, "1", "c2").await.unwrap();
    assert_eq!(h.connections.connections_of("1").len(), 2);

    // First disconnect: a connection remains, no presence change.
    let effects = h.engine.disconnect("c1").await.expect("disconnect");
    assert!(effects.is_empty());
    assert_eq!(h.users.get("1").await.unwrap().status, UserStatus::Online);

    // Last disconnect: user goes Offline and everyone hears it.
    let effects = h.engine.disconnect("c2").await.expect("disconnect");
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].scope, Scope::Broadcast);
    assert!(matches!(
        &effects[0].event,
        ServerEvent::UserStatusChanged { status: UserStatus::Offline, user_id, .. } if user_id == "1"
    ));
    assert_eq!(h.users.get("1").await.unwrap().status, UserStatus::Offline);
}

#[tokio::test]
async fn duplicate_disconnect_is_an_idempotent_noop() {
    let h = harness();
    h.engine.join(GENERAL_ROOM_ID, "1", "c1").await.unwrap();

    let first = h.engine.disconnect("c1").await.unwrap();
    assert_eq!(first.len(), 1);

    // Second notification for the same connection: no fan-out at all.
    let second = h.engine.disconnect("c1").await.unwrap();
    assert!(second.is_empty());

    // Unknown connection: same.
    assert!(h.engine.disconnect("never-bound").await.unwrap().is_empty());
}

#[tokio::test]
async fn join_marks_user_online() {
    let h = harness();
    h.users.set_status("1", UserStatus::Offline).await;

    h.engine.join(GENERAL_ROOM_ID, "1", "c1").await.unwrap();
    assert_eq!(h.users.get("1").await.unwrap().status, UserStatus::Online);
}

#[tokio::test]
async fn update_status_broadcasts_and_stamps_last_seen() {
    let h = harness();
    let before = h.users.get("1").await.unwrap().last_seen;

    let effects = h.engine.update_status("1", UserStatus::Busy).await.unwrap();
    assert_eq!(effects[0].scope, Scope::Broadcast);
    assert!(matches!(
        &effects[0].event,
        ServerEvent::UserStatusChanged { status: UserStatus::Busy, user_name, .. }
            if user_name == "Alice"
    ));

    let user = h.users.get("1").await.unwrap();
    assert_eq!(user.status, UserStatus::Busy);
    assert!(user.last_seen >= before);

    assert!(matches!(
        h.engine.update_status("nobody", UserStatus::Away).await,
        Err(ChatError::UserNotFound(_))
    ));
}

#[tokio::test]
async fn update_profile_broadcasts_snapshot() {
    let h = harness();

    let effects = h
        .engine
        .update_profile("1", "Alice L.", "https://example.com/a.png")
        .await
        .unwrap();
    assert_eq!(effects[0].scope, Scope::Broadcast);
    let ServerEvent::UserProfileUpdated { user } = &effects[0].event else {
        panic!("expected userProfileUpdated");
    };
    assert_eq!(user.name, "Alice L.");
    assert_eq!(user.avatar, "https://example.com/a.png");

    // Messages sent before the rename keep the old sender snapshot.
    let h = harness();
    let effects = h.engine.send(GENERAL_ROOM_ID, "1", "hi", None).await.unwrap();
    let ServerEvent::MessageReceived { message } = &effects[0].event else {
        panic!("expected message");
    };
    let message_id = message.id.clone();
    h.engine.update_profile("1", "Renamed", "").await.unwrap();
    let history = h.engine.get_message_history(GENERAL_ROOM_ID, 50, 0).await.unwrap();
    let ServerEvent::MessageHistory { messages, .. } = &history[0].event else {
        panic!("expected history");
    };
    let stored = messages.iter().find(|m| m.id == message_id).unwrap();
    assert_eq!(stored.sender_name, "Alice");
}

#[tokio::test]
async fn preferences_ack_goes_to_caller_only() {
    let h = harness();

    let mut prefs = std::collections::HashMap::new();
    prefs.insert("theme".to_string(), serde_json::json!("dark"));
    let effects = h.engine.update_preferences("1", prefs).await.unwrap();
    assert_eq!(effects[0].scope, Scope::Caller);

    let user = h.users.get("1").await.unwrap();
    assert_eq!(user.preferences["theme"], serde_json::json!("dark"));
}

#[tokio::test]
async fn online_users_reflects_presence() {
    let h = harness();
    h.users.set_status("2", UserStatus::Offline).await;

    let effects = h.engine.get_online_users().await.unwrap();
    let ServerEvent::OnlineUsers { users } = &effects[0].event else {
        panic!("expected onlineUsers");
    };
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "1");
}

#[tokio::test]
async fn created_user_can_immediately_chat() {
    let h = harness();

    let effects = h.engine.create_user("Carol", "carol@example.com", "").await.unwrap();
    assert_eq!(effects[0].scope, Scope::Broadcast);
    let ServerEvent::UserCreated { user } = &effects[0].event else {
        panic!("expected userCreated");
    };

    let effects = h
        .engine
        .send(GENERAL_ROOM_ID, &user.id, "hi from Carol", None)
        .await
        .expect("send as created user");
    let ServerEvent::MessageReceived { message } = &effects[0].event else {
        panic!("expected message");
    };
    assert_eq!(message.sender_name, "Carol");
}
