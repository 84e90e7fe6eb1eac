//! Call membership and signaling relay.
//!
//! The hub does not interpret offers, answers or ICE candidates. It only
//! relays them to the other sessions in the room's call group. Ringing
//! notices (`call`) go to the whole room instead.

use chrono::Utc;

use super::Context;
use crate::application::events::{
    CallAnswerPayload, CallIcePayload, CallNoticePayload, CallOfferPayload, ServerEvent,
};
use crate::application::fanout::{CallMembership, Fanout, Outcome, SessionId};
use crate::domain::GroupName;
use crate::shared::error::AppError;

/// Subscribe the session to the room's call group and announce it.
pub async fn join(ctx: &Context<'_>) -> Result<Outcome, AppError> {
    if ctx.active_call == Some(ctx.room_id) {
        return Ok(Outcome::none());
    }
    ctx.ensure_participant().await?;

    let announce = Fanout::excluding(
        GroupName::Call(ctx.room_id),
        ServerEvent::CallJoin {
            user_id: ctx.user_id(),
            username: ctx.user.display_name.clone(),
            timestamp: Utc::now(),
        },
        ctx.session_id,
    );
    Ok(Outcome::single(announce).with_call(CallMembership::Join(ctx.room_id)))
}

/// Leave the call. A session that is not in a call has nothing to leave.
pub async fn leave(ctx: &Context<'_>) -> Result<Outcome, AppError> {
    let Some(call_room) = ctx.active_call else {
        return Ok(Outcome::none());
    };

    Ok(Outcome::single(leave_announcement(
        ctx.session_id,
        ctx.user.id,
        &ctx.user.display_name,
        call_room,
    ))
    .with_call(CallMembership::Leave(call_room)))
}

/// `call.leave` for the call group, excluding the leaving session.
pub fn leave_announcement(
    session_id: SessionId,
    user_id: i64,
    username: &str,
    call_room: i64,
) -> Fanout {
    Fanout::excluding(
        GroupName::Call(call_room),
        ServerEvent::CallLeave {
            user_id,
            username: username.to_string(),
            timestamp: Utc::now(),
        },
        session_id,
    )
}

pub async fn offer(ctx: &Context<'_>, payload: CallOfferPayload) -> Result<Outcome, AppError> {
    let call_room = in_call(ctx)?;
    Ok(Outcome::single(Fanout::excluding(
        GroupName::Call(call_room),
        ServerEvent::CallOffer {
            user_id: ctx.user_id(),
            username: ctx.user.display_name.clone(),
            offer: payload.offer,
            timestamp: Utc::now(),
        },
        ctx.session_id,
    )))
}

pub async fn answer(ctx: &Context<'_>, payload: CallAnswerPayload) -> Result<Outcome, AppError> {
    let call_room = in_call(ctx)?;
    Ok(Outcome::single(Fanout::excluding(
        GroupName::Call(call_room),
        ServerEvent::CallAnswer {
            user_id: ctx.user_id(),
            username: ctx.user.display_name.clone(),
            answer: payload.answer,
            timestamp: Utc::now(),
        },
        ctx.session_id,
    )))
}

pub async fn ice(ctx: &Context<'_>, payload: CallIcePayload) -> Result<Outcome, AppError> {
    let call_room = in_call(ctx)?;
    Ok(Outcome::single(Fanout::excluding(
        GroupName::Call(call_room),
        ServerEvent::CallIce {
            user_id: ctx.user_id(),
            username: ctx.user.display_name.clone(),
            candidate: payload.candidate,
            timestamp: Utc::now(),
        },
        ctx.session_id,
    )))
}

/// Ring, answer, end or reject a call. Every room subscriber hears it,
/// whether or not they are in the call group.
pub async fn announce(ctx: &Context<'_>, payload: CallNoticePayload) -> Result<Outcome, AppError> {
    ctx.ensure_participant().await?;
    Ok(Outcome::single(Fanout::to(
        GroupName::Room(ctx.room_id),
        ServerEvent::CallEvent {
            user_id: ctx.user_id(),
            username: ctx.user.display_name.clone(),
            call_type: payload.call_type,
            action: payload.action,
            timestamp: Utc::now(),
        },
    )))
}

fn in_call(ctx: &Context<'_>) -> Result<i64, AppError> {
    ctx.active_call
        .ok_or_else(|| AppError::PermissionDenied("Join the call before signaling".into()))
}
