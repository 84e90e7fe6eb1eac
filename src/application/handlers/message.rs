//! Message handlers: send, read receipt, delete, pin and edit.

use chrono::Utc;

use super::Context;
use crate::application::events::{ChatMessagePayload, EditPayload, MessageRef, ServerEvent};
use crate::application::fanout::{Fanout, Outcome};
use crate::domain::{GroupName, MessageKind, NewMessage, RoomPolicy};
use crate::shared::error::AppError;

/// Create a message, fan it out to the room and notify every other participant.
pub async fn send(ctx: &Context<'_>, payload: ChatMessagePayload) -> Result<Outcome, AppError> {
    ctx.ensure_participant().await?;

    if payload.kind == MessageKind::System {
        return Err(AppError::InvalidArgument(
            "System messages cannot be sent by clients".into(),
        ));
    }

    let attachment = payload.attachment.filter(|a| !a.trim().is_empty());
    if payload.content.trim().is_empty() && attachment.is_none() {
        return Err(AppError::InvalidArgument(
            "Message content or attachment is required".into(),
        ));
    }

    let reply_to_id = match payload.reply_to {
        Some(id) => match ctx.storage.get_message(id, Some(ctx.room_id)).await {
            Ok(_) => Some(id),
            Err(AppError::NotFound(_)) => {
                tracing::debug!(reply_to = id, room_id = ctx.room_id, "Reply target not in room, ignoring");
                None
            }
            Err(e) => return Err(e),
        },
        None => None,
    };

    // Everything the fanout needs is read before the write so a failed read
    // cannot leave a committed message without its broadcast.
    let room = ctx.storage.get_room(ctx.room_id).await?;
    let participants = ctx.storage.list_participants(ctx.room_id).await?;

    let message = ctx
        .storage
        .create_message(NewMessage {
            room_id: ctx.room_id,
            sender_id: ctx.user_id(),
            content: payload.content,
            kind: payload.kind,
            attachment,
            reply_to_id,
            forwarded_from_id: None,
        })
        .await?;

    tracing::debug!(
        message_id = message.id,
        room_id = message.room_id,
        sender_id = message.sender_id,
        "Message created"
    );

    let room_name = room.label_for(&ctx.user.display_name);
    let mut fanout = Vec::with_capacity(participants.len() + 1);
    fanout.push(Fanout::to(
        GroupName::Room(ctx.room_id),
        ServerEvent::ChatMessage {
            message_id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            sender: ctx.user.display_name.clone(),
            content: message.content.clone(),
            message_type: message.kind,
            reply_to: message.reply_to_id,
            attachment: message.attachment.clone(),
            timestamp: message.created_at,
        },
    ));

    for participant in participants.into_iter().filter(|&p| p != ctx.user_id()) {
        fanout.push(Fanout::to(
            GroupName::User(participant),
            ServerEvent::Notification {
                message_id: message.id,
                room_id: message.room_id,
                room_name: room_name.clone(),
                sender: ctx.user.display_name.clone(),
                message_preview: message.preview(),
                timestamp: message.created_at,
            },
        ));
    }

    Ok(Outcome {
        fanout,
        call: None,
    })
}

/// Mark a message read. Missing targets and repeats produce nothing.
pub async fn read_receipt(ctx: &Context<'_>, payload: MessageRef) -> Result<Outcome, AppError> {
    ctx.ensure_participant().await?;

    match ctx.storage.get_message(payload.message_id, Some(ctx.room_id)).await {
        Ok(_) => {}
        Err(AppError::NotFound(_)) => return Ok(Outcome::none()),
        Err(e) => return Err(e),
    }

    if !ctx.storage.mark_read(payload.message_id).await? {
        return Ok(Outcome::none());
    }

    Ok(Outcome::single(Fanout::to(
        GroupName::Room(ctx.room_id),
        ServerEvent::ReadReceipt {
            message_id: payload.message_id,
            user_id: ctx.user_id(),
            username: ctx.user.display_name.clone(),
            timestamp: Utc::now(),
        },
    )))
}

/// Soft delete. Allowed for the author and the room admin.
pub async fn delete(ctx: &Context<'_>, payload: MessageRef) -> Result<Outcome, AppError> {
    ctx.ensure_participant().await?;

    let room = ctx.storage.get_room(ctx.room_id).await?;
    let message = ctx
        .storage
        .get_message(payload.message_id, Some(ctx.room_id))
        .await?;

    RoomPolicy::ensure_delete(&room, &message, ctx.user_id())?;

    // A concurrent delete may have won since the read
    if message.is_deleted || !ctx.storage.soft_delete(message.id).await? {
        return Ok(Outcome::none());
    }

    Ok(Outcome::single(Fanout::to(
        GroupName::Room(ctx.room_id),
        ServerEvent::MessageDeleted {
            message_id: message.id,
            deleted_by: ctx.user_id(),
            timestamp: Utc::now(),
        },
    )))
}

/// Toggle the pinned flag.
pub async fn pin(ctx: &Context<'_>, payload: MessageRef) -> Result<Outcome, AppError> {
    ctx.ensure_participant().await?;

    let room = ctx.storage.get_room(ctx.room_id).await?;
    RoomPolicy::ensure_pin(&room, ctx.user_id())?;

    let message = ctx
        .storage
        .get_message(payload.message_id, Some(ctx.room_id))
        .await?;
    if message.is_deleted {
        return Err(AppError::InvalidArgument(
            "Deleted messages cannot be pinned".into(),
        ));
    }

    let pinned = ctx.storage.toggle_pinned(message.id).await?;

    Ok(Outcome::single(Fanout::to(
        GroupName::Room(ctx.room_id),
        ServerEvent::MessagePinned {
            message_id: message.id,
            pinned,
            pinned_by: ctx.user_id(),
            timestamp: Utc::now(),
        },
    )))
}

/// Replace the content of the caller's own message.
pub async fn edit(ctx: &Context<'_>, payload: EditPayload) -> Result<Outcome, AppError> {
    ctx.ensure_participant().await?;

    if payload.content.trim().is_empty() {
        return Err(AppError::InvalidArgument("Message content is required".into()));
    }

    let message = ctx
        .storage
        .get_message(payload.message_id, Some(ctx.room_id))
        .await?;
    RoomPolicy::ensure_edit(&message, ctx.user_id())?;

    ctx.storage.edit_content(message.id, &payload.content).await?;

    Ok(Outcome::single(Fanout::to(
        GroupName::Room(ctx.room_id),
        ServerEvent::MessageEdited {
            message_id: message.id,
            content: payload.content,
            edited_by: ctx.user_id(),
            timestamp: Utc::now(),
        },
    )))
}
