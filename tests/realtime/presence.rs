//! Presence across multiple connections of one user.

use std::sync::Arc;
use std::time::Duration;

use chat_hub::domain::{StorageGateway, UserSummary};
use chat_hub::presentation::websocket::{Session, SessionKind};
use pretty_assertions::assert_eq;

use crate::common::*;

#[tokio::test]
async fn test_user_stays_online_until_last_connection_closes() {
    let hub = TestHub::new();
    let mut bob = hub.connect(BOB, DIRECT).await;
    bob.clear();

    let mut first = hub.connect(ALICE, DIRECT).await;
    assert_eq!(bob.names(), vec!["presence", "user_joined"]);

    let mut second = hub.connect(ALICE, TEAM).await;
    // Already online; bob's room sees nothing new
    assert!(bob.events().is_empty());
    assert_eq!(hub.gateway().presence().connection_count(ALICE).await, 2);

    first.close(&hub).await;
    assert_eq!(bob.names(), vec!["user_left"]);
    let presence = hub.storage.get_presence(ALICE).await.unwrap();
    assert!(presence.online);
    assert_eq!(presence.last_seen, None);

    second.close(&hub).await;
    let frames = bob.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "presence");
    assert_eq!(frames[0]["user_id"], ALICE);
    assert_eq!(frames[0]["online"], false);
    assert!(frames[0]["last_seen"].is_string());

    let presence = hub.storage.get_presence(ALICE).await.unwrap();
    assert!(!presence.online);
    assert!(presence.last_seen.is_some());
    assert_eq!(hub.gateway().presence().connection_count(ALICE).await, 0);
}

#[tokio::test]
async fn test_double_close_does_not_double_decrement() {
    let hub = TestHub::new();
    let mut first = hub.connect(ALICE, DIRECT).await;
    let _second = hub.connect(ALICE, DIRECT).await;

    first.close(&hub).await;
    first.close(&hub).await;

    assert_eq!(hub.gateway().presence().connection_count(ALICE).await, 1);
    assert!(hub.storage.get_presence(ALICE).await.unwrap().online);
    assert_eq!(hub.gateway().session_count(), 1);
}

#[tokio::test]
async fn test_presence_reaches_every_room_of_the_user() {
    let hub = TestHub::new();
    let mut bob = hub.connect(BOB, DIRECT).await;
    let mut carol = hub.connect(CAROL, TEAM).await;
    bob.clear();
    carol.clear();

    let _alice = hub.connect(ALICE, DIRECT).await;

    assert_eq!(bob.names(), vec!["presence", "user_joined"]);
    // Carol shares TEAM with alice but not DIRECT
    assert_eq!(carol.names(), vec!["presence"]);
}

#[tokio::test]
async fn test_notification_session_does_not_count_as_online() {
    let hub = TestHub::new();
    let mut notes = hub.notifications(ALICE).await;

    assert_eq!(hub.gateway().presence().connection_count(ALICE).await, 0);
    assert!(!hub.storage.get_presence(ALICE).await.unwrap().online);

    notes.close(&hub).await;
    assert_eq!(hub.gateway().session_count(), 0);
    assert_eq!(hub.gateway().registry().group_count(), 0);
}

#[tokio::test]
async fn test_online_users_snapshot_goes_to_new_session_only() {
    let hub = TestHub::new();
    let mut bob = hub.connect(BOB, DIRECT).await;
    bob.clear();

    let mut alice = hub.connect(ALICE, DIRECT).await;

    let frames = alice.frames();
    let snapshot = frames
        .iter()
        .find(|f| f["type"] == "online_users")
        .expect("snapshot sent on connect");
    assert_eq!(snapshot["room_id"], DIRECT);
    assert_eq!(snapshot["users"].as_array().map(Vec::len), Some(2));
    assert!(!bob.names().contains(&"online_users"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_connects_and_disconnects() {
    let hub = TestHub::new();
    let gateway = Arc::clone(&hub.state.gateway);

    let mut opened = Vec::new();
    for _ in 0..16 {
        let gateway = Arc::clone(&gateway);
        opened.push(tokio::spawn(async move {
            let (mut session, rx) = Session::new(
                UserSummary::new(ALICE, "alice"),
                SessionKind::Chat { room_id: DIRECT },
            );
            gateway.activate(&mut session).await.unwrap();
            (session, rx)
        }));
    }

    let mut sessions = Vec::new();
    for handle in opened {
        sessions.push(handle.await.unwrap());
    }
    assert_eq!(gateway.presence().connection_count(ALICE).await, 16);
    assert!(hub.storage.get_presence(ALICE).await.unwrap().online);

    let mut closed = Vec::new();
    for (mut session, rx) in sessions {
        let gateway = Arc::clone(&gateway);
        closed.push(tokio::spawn(async move {
            gateway.close(&mut session).await;
            drop(rx);
        }));
    }
    for handle in closed {
        handle.await.unwrap();
    }

    assert_eq!(gateway.presence().connection_count(ALICE).await, 0);
    assert!(!hub.storage.get_presence(ALICE).await.unwrap().online);
    assert_eq!(gateway.session_count(), 0);
    assert_eq!(gateway.registry().group_count(), 0);
}

#[tokio::test]
async fn test_reconnect_during_offline_broadcast_ends_online() {
    let hub = TestHub::with_slow_rooms(Duration::from_millis(300));
    let mut bob = hub.connect(BOB, DIRECT).await;
    let first = hub.connect(ALICE, DIRECT).await;
    bob.clear();

    // Closing the only tab stalls inside the offline broadcast
    let gateway = Arc::clone(&hub.state.gateway);
    let mut session = first.session;
    let closing = tokio::spawn(async move {
        gateway.close(&mut session).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let _second = hub.connect(ALICE, DIRECT).await;
    closing.await.unwrap();

    let online: Vec<bool> = bob
        .frames()
        .iter()
        .filter(|f| f["type"] == "presence")
        .map(|f| f["online"].as_bool().unwrap())
        .collect();
    assert_eq!(online, vec![false, true]);
    assert_eq!(hub.gateway().presence().connection_count(ALICE).await, 1);
    assert!(hub.storage.get_presence(ALICE).await.unwrap().online);
}
