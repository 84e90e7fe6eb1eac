//! Reaction toggle.

use chrono::Utc;

use super::Context;
use crate::application::events::{ReactionPayload, ServerEvent};
use crate::application::fanout::{Fanout, Outcome};
use crate::domain::{GroupName, ReactionKind, ReactionOutcome};
use crate::shared::error::AppError;

/// Same value removes, a different value replaces, no value adds.
pub async fn react(ctx: &Context<'_>, payload: ReactionPayload) -> Result<Outcome, AppError> {
    let kind = ReactionKind::parse(&payload.reaction)?;
    ctx.ensure_participant().await?;

    let message = ctx
        .storage
        .get_message(payload.message_id, Some(ctx.room_id))
        .await?;

    let outcome = ctx
        .storage
        .upsert_reaction(message.id, ctx.user_id(), kind)
        .await?;

    let event = match outcome {
        ReactionOutcome::Added(reaction) | ReactionOutcome::Changed { reaction, .. } => {
            ServerEvent::MessageReaction {
                message_id: message.id,
                user_id: ctx.user_id(),
                username: ctx.user.display_name.clone(),
                reaction: reaction.kind,
                emoji: reaction.kind.emoji().to_string(),
                timestamp: reaction.created_at,
            }
        }
        ReactionOutcome::Removed { previous } => ServerEvent::MessageReactionRemoved {
            message_id: message.id,
            user_id: ctx.user_id(),
            username: ctx.user.display_name.clone(),
            reaction: previous,
            timestamp: Utc::now(),
        },
    };

    Ok(Outcome::single(Fanout::to(GroupName::Room(ctx.room_id), event)))
}
