//! Message lifecycle through the gateway: send, read, delete, pin, edit, forward.

use chat_hub::domain::{StorageGateway, DELETED_PLACEHOLDER};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_send_reaches_room_and_notifies_absent_participant() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    // Bob is a participant but only has his notification session open
    let mut bob_notes = hub.notifications(BOB).await;
    alice.clear();
    bob_notes.clear();

    alice.send(&hub, json!({"type": "chat_message", "content": "hi"})).await;

    let frames = alice.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "chat_message");
    assert_eq!(frames[0]["sender_id"], ALICE);
    assert_eq!(frames[0]["sender"], "alice");
    assert_eq!(frames[0]["content"], "hi");
    assert_eq!(frames[0]["message_type"], "text");
    assert!(frames[0]["timestamp"].is_string());

    let notes = bob_notes.frames();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["type"], "notification");
    assert_eq!(notes[0]["room_id"], DIRECT);
    assert_eq!(notes[0]["room_name"], "Chat with alice");
    assert_eq!(notes[0]["message_preview"], "hi");
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    alice.clear();

    alice.send(&hub, json!({"type": "chat_message", "content": "   "})).await;

    let frames = alice.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "error");
    assert_eq!(frames[0]["code"], "invalid_argument");
    assert!(hub.storage.messages_in(DIRECT).is_empty());
}

#[tokio::test]
async fn test_reply_to_foreign_message_is_dropped_but_message_sent() {
    let hub = TestHub::new();
    let mut carol = hub.connect(CAROL, OTHER).await;
    let mut alice = hub.connect(ALICE, DIRECT).await;
    carol.send(&hub, json!({"type": "chat_message", "content": "elsewhere"})).await;
    let foreign = hub.storage.messages_in(OTHER)[0].id;
    alice.clear();

    alice
        .send(&hub, json!({"type": "chat_message", "content": "re", "reply_to": foreign}))
        .await;

    let frames = alice.frames();
    assert_eq!(frames[0]["type"], "chat_message");
    assert!(frames[0]["reply_to"].is_null());
    assert_eq!(hub.storage.messages_in(DIRECT)[0].reply_to_id, None);
}

#[tokio::test]
async fn test_read_receipt_is_idempotent() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut bob = hub.connect(BOB, DIRECT).await;
    alice.send(&hub, json!({"type": "chat_message", "content": "ping"})).await;
    let message_id = hub.storage.messages_in(DIRECT)[0].id;
    alice.clear();
    bob.clear();

    bob.send(&hub, json!({"type": "read_receipt", "message_id": message_id})).await;
    let read_at = hub.storage.get_message(message_id, None).await.unwrap().read_at;
    assert_eq!(alice.names(), vec!["read_receipt"]);
    assert_eq!(bob.names(), vec!["read_receipt"]);

    bob.send(&hub, json!({"type": "read_receipt", "message_id": message_id})).await;
    assert!(alice.events().is_empty());
    assert!(bob.events().is_empty());
    assert_eq!(hub.storage.get_message(message_id, None).await.unwrap().read_at, read_at);

    // Unknown targets are ignored without an error
    bob.send(&hub, json!({"type": "read_receipt", "message_id": 123456})).await;
    assert!(bob.events().is_empty());
}

#[tokio::test]
async fn test_soft_delete_is_terminal() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut bob = hub.connect(BOB, DIRECT).await;
    alice
        .send(&hub, json!({"type": "chat_message", "content": "findable text", "attachment": "files/a.png"}))
        .await;
    let message_id = hub.storage.messages_in(DIRECT)[0].id;
    alice.clear();
    bob.clear();

    // Bob is neither author nor admin
    bob.send(&hub, json!({"type": "delete_message", "message_id": message_id})).await;
    assert_eq!(bob.frames()[0]["code"], "permission_denied");
    assert!(alice.events().is_empty());

    alice.send(&hub, json!({"type": "delete_message", "message_id": message_id})).await;
    let frames = bob.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "message_deleted");
    assert_eq!(frames[0]["deleted_by"], ALICE);

    let stored = hub.storage.get_message(message_id, None).await.unwrap();
    assert_eq!(stored.content, DELETED_PLACEHOLDER);
    assert_eq!(stored.attachment, None);
    assert!(hub.storage.search_messages(DIRECT, "findable", 10).await.unwrap().is_empty());

    alice.clear();
    alice
        .send(&hub, json!({"type": "edit_message", "message_id": message_id, "content": "back"}))
        .await;
    assert_eq!(alice.frames()[0]["code"], "permission_denied");
    assert!(bob.events().is_empty());
    assert_eq!(
        hub.storage.get_message(message_id, None).await.unwrap().content,
        DELETED_PLACEHOLDER
    );
}

#[tokio::test]
async fn test_admin_can_delete_in_group_room() {
    let hub = TestHub::new();
    let mut bob = hub.connect(BOB, TEAM).await;
    let mut alice = hub.connect(ALICE, TEAM).await;
    bob.send(&hub, json!({"type": "chat_message", "content": "oops"})).await;
    let message_id = hub.storage.messages_in(TEAM)[0].id;
    bob.clear();

    alice.send(&hub, json!({"type": "delete_message", "message_id": message_id})).await;

    assert_eq!(bob.names(), vec!["message_deleted"]);
    assert!(hub.storage.get_message(message_id, None).await.unwrap().is_deleted);
}

#[tokio::test]
async fn test_non_admin_pin_in_group_room_is_denied() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, TEAM).await;
    let mut bob = hub.connect(BOB, TEAM).await;
    alice.send(&hub, json!({"type": "chat_message", "content": "agenda"})).await;
    let message_id = hub.storage.messages_in(TEAM)[0].id;
    alice.clear();
    bob.clear();

    bob.send(&hub, json!({"type": "pin_message", "message_id": message_id})).await;

    let frames = bob.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["code"], "permission_denied");
    assert_eq!(frames[0]["request_type"], "pin_message");
    assert!(alice.events().is_empty());
    assert!(!hub.storage.get_message(message_id, None).await.unwrap().pinned);

    alice.send(&hub, json!({"type": "pin_message", "message_id": message_id})).await;
    let frames = bob.frames();
    assert_eq!(frames[0]["type"], "message_pinned");
    assert_eq!(frames[0]["pinned"], true);
}

#[tokio::test]
async fn test_edit_by_author_only() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut bob = hub.connect(BOB, DIRECT).await;
    alice.send(&hub, json!({"type": "chat_message", "content": "draft"})).await;
    let message_id = hub.storage.messages_in(DIRECT)[0].id;
    alice.clear();
    bob.clear();

    bob.send(&hub, json!({"type": "edit_message", "message_id": message_id, "content": "mine"})).await;
    assert_eq!(bob.frames()[0]["code"], "permission_denied");

    alice.send(&hub, json!({"type": "edit_message", "message_id": message_id, "content": "final"})).await;
    let frames = bob.frames();
    assert_eq!(frames[0]["type"], "message_edited");
    assert_eq!(frames[0]["content"], "final");

    let stored = hub.storage.get_message(message_id, None).await.unwrap();
    assert_eq!(stored.content, "final");
    assert!(stored.edited_at.is_some());
}

#[tokio::test]
async fn test_forward_summary_goes_to_sender_only() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    let mut team_bob = hub.connect(BOB, TEAM).await;
    let mut alice_notes = hub.notifications(ALICE).await;
    alice.send(&hub, json!({"type": "chat_message", "content": "minutes"})).await;
    let message_id = hub.storage.messages_in(DIRECT)[0].id;
    alice.clear();
    team_bob.clear();
    alice_notes.clear();

    alice
        .send(&hub, json!({"type": "forward_message", "message_id": message_id, "rooms": [TEAM, OTHER, 999]}))
        .await;

    // Personal group: both of alice's sessions get the summary
    for frames in [alice.frames(), alice_notes.frames()] {
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "message_forwarded");
        assert_eq!(frames[0]["rooms"], json!([TEAM]));
        assert_eq!(frames[0]["skipped"], json!([OTHER, 999]));
    }
    // Target room subscribers learn of it on their next fetch
    assert!(team_bob.events().is_empty());

    let copies = hub.storage.messages_in(TEAM);
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].content, "Forwarded: minutes");
    assert_eq!(copies[0].forwarded_from_id, Some(message_id));
    assert!(hub.storage.messages_in(OTHER).is_empty());
}

#[tokio::test]
async fn test_notification_session_replays_pending_unread() {
    let hub = TestHub::new();
    let mut alice = hub.connect(ALICE, DIRECT).await;
    alice.send(&hub, json!({"type": "chat_message", "content": "while you were out"})).await;
    alice.send(&hub, json!({"type": "chat_message", "content": "one more"})).await;
    let first = hub.storage.messages_in(DIRECT)[0].id;
    bob_reads(&hub, first).await;

    let mut bob_notes = hub.notifications(BOB).await;

    let frames = bob_notes.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "notification");
    assert_eq!(frames[0]["message_preview"], "one more");
    assert_eq!(frames[0]["sender"], "alice");

    // Inbound frames on a notification session are ignored
    bob_notes.send(&hub, json!({"type": "chat_message", "content": "nope"})).await;
    assert_eq!(hub.storage.messages_in(DIRECT).len(), 2);
    assert!(bob_notes.events().is_empty());
}

async fn bob_reads(hub: &TestHub, message_id: i64) {
    let mut bob = hub.connect(BOB, DIRECT).await;
    bob.send(hub, json!({"type": "read_receipt", "message_id": message_id})).await;
    bob.close(hub).await;
}
