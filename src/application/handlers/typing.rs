//! Typing indicator relay.

use chrono::Utc;

use super::Context;
use crate::application::events::{ServerEvent, TypingPayload};
use crate::application::fanout::{Fanout, Outcome};
use crate::domain::GroupName;
use crate::shared::error::AppError;

pub async fn typing(ctx: &Context<'_>, payload: TypingPayload) -> Result<Outcome, AppError> {
    ctx.ensure_participant().await?;

    Ok(Outcome::single(Fanout::to(
        GroupName::Room(ctx.room_id),
        ServerEvent::Typing {
            user_id: ctx.user_id(),
            username: ctx.user.display_name.clone(),
            is_typing: payload.is_typing,
            timestamp: Utc::now(),
        },
    )))
}
