//! Forwarding a message into other rooms.

use chrono::Utc;

use super::Context;
use crate::application::events::{ForwardPayload, ServerEvent};
use crate::application::fanout::{Fanout, Outcome};
use crate::domain::{GroupName, NewMessage, RoomPolicy};
use crate::shared::error::AppError;

/// Copy the caller's own message into every valid target room.
///
/// Targets that do not exist, are inactive, or do not include the sender are
/// skipped while the rest proceed. The summary goes to the sender's personal
/// group only.
pub async fn forward(ctx: &Context<'_>, payload: ForwardPayload) -> Result<Outcome, AppError> {
    let original = ctx.storage.get_message(payload.message_id, None).await?;

    if !RoomPolicy::can_forward(&original, ctx.user_id()) {
        return Err(AppError::PermissionDenied(
            "Only the author can forward this message".into(),
        ));
    }
    if original.is_deleted {
        return Err(AppError::InvalidArgument(
            "Deleted messages cannot be forwarded".into(),
        ));
    }

    let mut targets = payload.rooms;
    let mut seen = std::collections::HashSet::new();
    targets.retain(|room_id| seen.insert(*room_id));

    let mut forwarded = Vec::new();
    let mut skipped = Vec::new();

    for room_id in targets {
        match forward_one(ctx, &original, room_id).await {
            Ok(()) => forwarded.push(room_id),
            Err(e) => {
                tracing::debug!(
                    message_id = original.id,
                    target_room = room_id,
                    error = %e,
                    "Skipping forward target"
                );
                skipped.push(room_id);
            }
        }
    }

    Ok(Outcome::single(Fanout::to(
        GroupName::User(ctx.user_id()),
        ServerEvent::MessageForwarded {
            message_id: original.id,
            rooms: forwarded,
            skipped,
            timestamp: Utc::now(),
        },
    )))
}

async fn forward_one(
    ctx: &Context<'_>,
    original: &crate::domain::Message,
    room_id: i64,
) -> Result<(), AppError> {
    ctx.storage.get_room(room_id).await?;
    if !ctx.storage.is_participant(room_id, ctx.user_id()).await? {
        return Err(AppError::PermissionDenied(format!(
            "Not a participant of room {}",
            room_id
        )));
    }

    ctx.storage
        .create_message(NewMessage::forwarded(original, room_id, ctx.user_id()))
        .await?;
    Ok(())
}
