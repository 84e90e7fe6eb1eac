//! Users outside a room never see its events.

use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_outsider_receives_nothing_from_room() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut bob = hub.connect(BOB, DIRECT).await;
    let mut carol = hub.connect(CAROL, OTHER).await;
    let mut carol_notes = hub.notifications(CAROL).await;
    carol.clear();
    carol_notes.clear();

    alice.send(&hub, json!({"type": "chat_message", "content": "hi"})).await;
    let message_id = hub.storage.messages_in(DIRECT)[0].id;

    alice.send(&hub, json!({"type": "typing", "is_typing": true})).await;
    bob.send(&hub, json!({"type": "read_receipt", "message_id": message_id})).await;
    bob.send(&hub, json!({"type": "reaction", "message_id": message_id, "reaction": "wow"})).await;
    alice.send(&hub, json!({"type": "edit_message", "message_id": message_id, "content": "hey"})).await;
    alice.send(&hub, json!({"type": "pin_message", "message_id": message_id})).await;
    alice.send(&hub, json!({"type": "call.join"})).await;
    bob.send(&hub, json!({"type": "call.join"})).await;
    alice.send(&hub, json!({"type": "call.offer", "offer": {"sdp": "v=0"}})).await;
    alice.send(&hub, json!({"type": "delete_message", "message_id": message_id})).await;
    alice.close(&hub).await;

    assert!(carol.events().is_empty());
    assert!(carol_notes.events().is_empty());
    assert!(!bob.events().is_empty());
}

#[tokio::test]
async fn test_outsider_cannot_act_on_room_messages_through_own_session() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut carol = hub.connect(CAROL, OTHER).await;

    alice.send(&hub, json!({"type": "chat_message", "content": "secret"})).await;
    let message_id = hub.storage.messages_in(DIRECT)[0].id;
    alice.clear();
    carol.clear();

    // The message lives in another room, so it is invisible from carol's room
    carol.send(&hub, json!({"type": "reaction", "message_id": message_id, "reaction": "like"})).await;
    carol.send(&hub, json!({"type": "delete_message", "message_id": message_id})).await;

    let frames = carol.frames();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f["type"] == "error" && f["code"] == "not_found"));
    assert!(alice.events().is_empty());
    assert_eq!(hub.storage.reaction_count(message_id), 0);
}

#[tokio::test]
async fn test_removed_participant_is_rejected_on_next_event() {
    let hub = TestHub::new();
    let mut bob = hub.connect(BOB, TEAM).await;
    let mut alice = hub.connect(ALICE, TEAM).await;
    bob.clear();
    alice.clear();

    hub.storage.remove_participant(TEAM, BOB);
    bob.send(&hub, json!({"type": "chat_message", "content": "still here?"})).await;

    let frames = bob.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["code"], "permission_denied");
    assert_eq!(frames[0]["request_type"], "chat_message");
    assert!(alice.events().is_empty());
    assert!(hub.storage.messages_in(TEAM).is_empty());
}
