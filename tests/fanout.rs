//! End-to-end dispatch tests: JSON commands through the engine, effects
//! delivered through the fan-out router to per-connection queues.

mod common;

use std::sync::Arc;

use chatterd::broadcast::FanoutRouter;
use chatterd::events::{ClientCommand, ServerEvent};
use chatterd::state::GENERAL_ROOM_ID;
use common::harness;

fn command(json: &str) -> ClientCommand {
    serde_json::from_str(json).expect("valid command")
}

#[tokio::test]
async fn room_message_reaches_members_but_not_outsiders() {
    let h = harness();
    let router = Arc::new(FanoutRouter::new(h.rooms.clone(), h.connections.clone()));

    let mut alice_rx = router.register("c1");
    let mut bob_rx = router.register("c2");
    let mut stranger_rx = router.register("c3");

    for (conn, user) in [("c1", "1"), ("c2", "2")] {
        let effects = h
            .engine
            .dispatch(
                conn,
                command(&format!(
                    r#"{{"type":"joinRoom","roomId":"general","userId":"{user}"}}"#
                )),
            )
            .await
            .expect("join");
        router.deliver_all(conn, effects).await;
    }
    // Drain join traffic.
    while alice_rx.try_recv().is_ok() {}
    while bob_rx.try_recv().is_ok() {}
    while stranger_rx.try_recv().is_ok() {}

    let effects = h
        .engine
        .dispatch(
            "c1",
            command(r#"{"type":"sendMessage","roomId":"general","userId":"1","content":"hello"}"#),
        )
        .await
        .expect("send");
    router.deliver_all("c1", effects).await;

    // Both members see the message, including the sender.
    for rx in [&mut alice_rx, &mut bob_rx] {
        let event = rx.try_recv().expect("member receives message");
        assert!(matches!(
            &*event,
            ServerEvent::MessageReceived { message } if message.content == "hello"
        ));
    }
    // The stranger's connection is not in the room.
    assert!(stranger_rx.try_recv().is_err());
}

#[tokio::test]
async fn deletion_notice_is_global() {
    let h = harness();
    let router = Arc::new(FanoutRouter::new(h.rooms.clone(), h.connections.clone()));

    let effects = h.engine.join(GENERAL_ROOM_ID, "1", "c1").await.unwrap();
    router.deliver_all("c1", effects).await;
    let mut outsider_rx = router.register("c9");

    let effects = h
        .engine
        .send(GENERAL_ROOM_ID, "1", "to be removed", None)
        .await
        .unwrap();
    let ServerEvent::MessageReceived { message } = &effects[0].event else {
        panic!("expected message");
    };
    let message_id = message.id.clone();

    let effects = h
        .engine
        .dispatch(
            "c1",
            command(&format!(
                r#"{{"type":"deleteMessage","messageId":"{message_id}","userId":"1"}}"#
            )),
        )
        .await
        .expect("delete");
    router.deliver_all("c1", effects).await;

    // Even a connection with no room membership hears the deletion.
    let event = outsider_rx.try_recv().expect("broadcast reaches outsider");
    assert!(matches!(
        &*event,
        ServerEvent::MessageDeleted { message_id: id } if *id == message_id
    ));
}

#[tokio::test]
async fn user_scoped_notification_reaches_all_devices_of_target() {
    let h = harness();
    let router = Arc::new(FanoutRouter::new(h.rooms.clone(), h.connections.clone()));

    let mut dev1_rx = router.register("c1");
    let mut dev2_rx = router.register("c2");
    let mut bob_rx = router.register("c3");
    h.engine.join(GENERAL_ROOM_ID, "1", "c1").await.unwrap();
    h.engine.join(GENERAL_ROOM_ID, "1", "c2").await.unwrap();
    h.engine.join(GENERAL_ROOM_ID, "2", "c3").await.unwrap();

    let effects = h
        .engine
        .dispatch(
            "c3",
            command(
                r#"{"type":"sendNotification","userId":"1","title":"Ping","message":"Bob waved"}"#,
            ),
        )
        .await
        .expect("notify");
    router.deliver_all("c3", effects).await;

    for rx in [&mut dev1_rx, &mut dev2_rx] {
        let event = rx.try_recv().expect("device receives notification");
        assert!(matches!(
            &*event,
            ServerEvent::NotificationReceived { notification } if notification.title == "Ping"
        ));
    }
    assert!(bob_rx.try_recv().is_err());
}
