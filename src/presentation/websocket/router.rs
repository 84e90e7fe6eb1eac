//! Event Router
//!
//! Decodes one inbound frame, runs the matching handler and publishes its
//! outcome. Unknown types are dropped. Malformed or rejected events produce an
//! `error` frame to the sender, except for best-effort kinds which are
//! dropped silently.

use std::time::Instant;

use serde_json::Value;

use super::gateway::Gateway;
use super::session::Session;
use crate::application::handlers::{self, Context};
use crate::application::{CallMembership, ClientEvent, EventKind, Outcome, ServerEvent};
use crate::domain::GroupName;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

pub(crate) async fn dispatch(gateway: &Gateway, session: &mut Session, text: &str) {
    let Some(room_id) = session.kind.room_id() else {
        tracing::trace!(session_id = %session.id, "Ignoring frame on notification session");
        return;
    };

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(session_id = %session.id, error = %e, "Dropping non-JSON frame");
            metrics::record_event("unknown", "malformed");
            return;
        }
    };

    let Some(kind) = value
        .get("type")
        .and_then(Value::as_str)
        .and_then(EventKind::parse)
    else {
        tracing::debug!(
            session_id = %session.id,
            event_type = ?value.get("type"),
            "Dropping unknown event type"
        );
        metrics::record_event("unknown", "unknown");
        return;
    };

    let event = match decode(value) {
        Ok(event) => event,
        Err(err) => {
            reject(session, kind, &err, "malformed");
            return;
        }
    };

    let started = Instant::now();
    let result = {
        let ctx = Context {
            storage: gateway.storage(),
            user: &session.user,
            session_id: session.id,
            room_id,
            active_call: session.active_call(),
        };
        route(&ctx, event).await
    };
    metrics::record_handler_duration(kind.as_str(), started.elapsed().as_secs_f64());

    match result {
        Ok(outcome) => {
            apply(gateway, session, outcome);
            metrics::record_event(kind.as_str(), "ok");
        }
        Err(err) => reject(session, kind, &err, "rejected"),
    }
}

fn decode(value: Value) -> Result<ClientEvent, AppError> {
    let event: ClientEvent = serde_json::from_value(value)
        .map_err(|e| AppError::InvalidArgument(format!("Malformed payload: {}", e)))?;
    event.validate()?;
    Ok(event)
}

/// One arm per event kind; adding a kind without a handler fails to compile.
async fn route(ctx: &Context<'_>, event: ClientEvent) -> Result<Outcome, AppError> {
    match event {
        ClientEvent::ChatMessage(payload) => handlers::message::send(ctx, payload).await,
        ClientEvent::Typing(payload) => handlers::typing::typing(ctx, payload).await,
        ClientEvent::ReadReceipt(payload) => handlers::message::read_receipt(ctx, payload).await,
        ClientEvent::Reaction(payload) => handlers::reaction::react(ctx, payload).await,
        ClientEvent::DeleteMessage(payload) => handlers::message::delete(ctx, payload).await,
        ClientEvent::PinMessage(payload) => handlers::message::pin(ctx, payload).await,
        ClientEvent::EditMessage(payload) => handlers::message::edit(ctx, payload).await,
        ClientEvent::ForwardMessage(payload) => handlers::forward::forward(ctx, payload).await,
        ClientEvent::CallOffer(payload) => handlers::call::offer(ctx, payload).await,
        ClientEvent::CallAnswer(payload) => handlers::call::answer(ctx, payload).await,
        ClientEvent::CallIce(payload) => handlers::call::ice(ctx, payload).await,
        ClientEvent::CallJoin {} => handlers::call::join(ctx).await,
        ClientEvent::CallLeave {} => handlers::call::leave(ctx).await,
        ClientEvent::Call(payload) => handlers::call::announce(ctx, payload).await,
    }
}

/// Apply call membership, then publish. Runs only after the handler's
/// mutation has committed.
fn apply(gateway: &Gateway, session: &mut Session, outcome: Outcome) {
    match outcome.call {
        Some(CallMembership::Join(call_room)) => {
            if let Some(previous) = session.active_call() {
                gateway.unsubscribe(session, GroupName::Call(previous));
            }
            gateway.subscribe(session, GroupName::Call(call_room));
            session.set_active_call(Some(call_room));
        }
        Some(CallMembership::Leave(call_room)) => {
            gateway.unsubscribe(session, GroupName::Call(call_room));
            session.set_active_call(None);
        }
        None => {}
    }

    for fanout in outcome.fanout {
        gateway.publish(fanout);
    }
}

fn reject(session: &Session, kind: EventKind, err: &AppError, outcome: &str) {
    if kind.is_best_effort() {
        tracing::debug!(session_id = %session.id, kind = %kind, error = %err, "Dropping best-effort event");
        metrics::record_event(kind.as_str(), "dropped");
        return;
    }

    if err.is_transient() {
        tracing::warn!(session_id = %session.id, kind = %kind, error = %err, "Storage failure, event dropped");
    } else {
        tracing::debug!(session_id = %session.id, kind = %kind, error = %err, "Event rejected");
    }
    metrics::record_event(kind.as_str(), outcome);
    session.send(ServerEvent::error(err, Some(kind)));
}
