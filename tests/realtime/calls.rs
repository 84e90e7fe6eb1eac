//! Call membership, signaling relay and typing.

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_signaling_reaches_other_call_members_only() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, TEAM).await;
    let mut bob = hub.connect(BOB, TEAM).await;
    let mut carol = hub.connect(CAROL, TEAM).await;

    alice.send(&hub, json!({"type": "call.join"})).await;
    bob.send(&hub, json!({"type": "call.join"})).await;
    alice.clear();
    bob.clear();
    carol.clear();

    alice
        .send(&hub, json!({"type": "call.offer", "offer": {"sdp": "v=0", "type": "offer"}}))
        .await;

    let frames = bob.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "call.offer");
    assert_eq!(frames[0]["user_id"], ALICE);
    assert_eq!(frames[0]["offer"]["sdp"], "v=0");
    // Sender and non-members see nothing
    assert!(alice.events().is_empty());
    assert!(carol.events().is_empty());

    bob.send(&hub, json!({"type": "call.ice", "candidate": {"candidate": "a=1"}})).await;
    assert_eq!(alice.names(), vec!["call.ice"]);
}

#[tokio::test]
async fn test_signaling_reaches_senders_other_tab() {
    let hub = TestHub::new();
    let mut desk = hub.connect(ALICE, TEAM).await;
    let mut phone = hub.connect(ALICE, TEAM).await;
    let mut bob = hub.connect(BOB, TEAM).await;

    for client in [&mut desk, &mut phone, &mut bob] {
        client.send(&hub, json!({"type": "call.join"})).await;
    }
    desk.clear();
    phone.clear();
    bob.clear();

    desk.send(&hub, json!({"type": "call.offer", "offer": {"sdp": "v=0"}})).await;

    assert!(desk.events().is_empty());
    assert_eq!(phone.names(), vec!["call.offer"]);
    assert_eq!(bob.names(), vec!["call.offer"]);
}

#[tokio::test]
async fn test_join_announces_to_existing_members() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut bob = hub.connect(BOB, DIRECT).await;
    alice.send(&hub, json!({"type": "call.join"})).await;
    alice.clear();
    bob.clear();

    bob.send(&hub, json!({"type": "call.join"})).await;

    assert_eq!(alice.names(), vec!["call.join"]);
    assert!(bob.events().is_empty());
    assert_eq!(bob.session.active_call(), Some(DIRECT));
}

#[tokio::test]
async fn test_signaling_outside_call_is_dropped_silently() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut bob = hub.connect(BOB, DIRECT).await;
    bob.send(&hub, json!({"type": "call.join"})).await;
    alice.clear();
    bob.clear();

    alice.send(&hub, json!({"type": "call.answer", "answer": {"sdp": "v=0"}})).await;

    // Best-effort kinds never produce an error frame
    assert!(alice.events().is_empty());
    assert!(bob.events().is_empty());
}

#[tokio::test]
async fn test_leave_and_close_announce_departure() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut bob = hub.connect(BOB, DIRECT).await;
    alice.send(&hub, json!({"type": "call.join"})).await;
    bob.send(&hub, json!({"type": "call.join"})).await;
    alice.clear();

    bob.send(&hub, json!({"type": "call.leave"})).await;
    assert_eq!(alice.names(), vec!["call.leave"]);
    assert_eq!(bob.session.active_call(), None);

    // Leaving twice has nothing to leave
    bob.send(&hub, json!({"type": "call.leave"})).await;
    assert!(alice.events().is_empty());

    bob.send(&hub, json!({"type": "call.join"})).await;
    alice.clear();
    bob.close(&hub).await;
    let names = alice.names();
    assert_eq!(names.first(), Some(&"call.leave"));
    assert!(names.contains(&"user_left"));
}

#[tokio::test]
async fn test_typing_goes_to_whole_room() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut bob = hub.connect(BOB, DIRECT).await;
    alice.clear();
    bob.clear();

    alice.send(&hub, json!({"type": "typing", "is_typing": true})).await;

    for frames in [alice.frames(), bob.frames()] {
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "typing");
        assert_eq!(frames[0]["is_typing"], true);
        assert_eq!(frames[0]["username"], "alice");
    }
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut bob = hub.connect(BOB, DIRECT).await;
    alice.clear();
    bob.clear();

    hub.gateway().handle_frame(&mut alice.session, "not json").await;
    alice.send(&hub, json!({"type": "join_room", "room": 1})).await;
    alice.send(&hub, json!({"content": "no type"})).await;

    assert!(alice.events().is_empty());
    assert!(bob.events().is_empty());
}

#[tokio::test]
async fn test_call_notice_reaches_room_members_outside_call() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, TEAM).await;
    let mut bob = hub.connect(BOB, TEAM).await;
    let mut dave = hub.connect(DAVE, OTHER).await;
    alice.clear();
    bob.clear();
    dave.clear();

    alice.send(&hub, json!({"type": "call", "call_type": "video", "action": "start"})).await;

    // Nobody has joined the call group; the whole room still hears it
    for frames in [alice.frames(), bob.frames()] {
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "call_event");
        assert_eq!(frames[0]["user_id"], ALICE);
        assert_eq!(frames[0]["username"], "alice");
        assert_eq!(frames[0]["call_type"], "video");
        assert_eq!(frames[0]["action"], "start");
    }
    assert!(dave.events().is_empty());

    bob.send(&hub, json!({"type": "call", "action": "answer"})).await;
    let frames = alice.frames();
    assert_eq!(frames[0]["call_type"], "voice");
    assert_eq!(frames[0]["action"], "answer");

    bob.clear();
    bob.send(&hub, json!({"type": "call", "action": "hold"})).await;
    assert!(alice.events().is_empty());
    assert!(bob.events().is_empty());
}
