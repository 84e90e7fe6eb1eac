//! WebSocket Connection Handler
//!
//! Authorizes the handshake, upgrades, and drives one connection: a writer
//! task drains the session's outbound queue while the reader processes inbound
//! frames one at a time. Whichever side ends first closes the session.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::timeout;

use super::gateway::Gateway;
use super::session::{Session, SessionKind};
use crate::config::WebSocketSettings;
use crate::domain::UserSummary;
use crate::presentation::middleware::auth;
use crate::shared::error::AppError;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct HandshakeQuery {
    pub token: Option<String>,
}

/// `GET /ws/chat/{room_id}`
///
/// Identity and room membership are checked before the upgrade itself, so a
/// rejected handshake never reaches the session layer.
pub async fn chat_ws_handler(
    Path(room_id): Path<i64>,
    Query(query): Query<HandshakeQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let user_id = auth::authenticate(query.token.as_deref(), &headers, &state.settings.jwt.secret)?;
    let user = state.gateway.authorize_chat(user_id, room_id).await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    tracing::debug!(user_id, room_id, "Chat handshake accepted");
    Ok(upgrade(ws, &state.settings.websocket)
        .on_upgrade(move |socket| run_session(socket, state, user, SessionKind::Chat { room_id })))
}

/// `GET /ws/notifications`
pub async fn notifications_ws_handler(
    Query(query): Query<HandshakeQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let user_id = auth::authenticate(query.token.as_deref(), &headers, &state.settings.jwt.secret)?;
    let user = state.gateway.authorize_user(user_id).await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    tracing::debug!(user_id, "Notification handshake accepted");
    Ok(upgrade(ws, &state.settings.websocket)
        .on_upgrade(move |socket| run_session(socket, state, user, SessionKind::Notifications)))
}

fn upgrade(ws: WebSocketUpgrade, settings: &WebSocketSettings) -> WebSocketUpgrade {
    ws.max_message_size(settings.max_message_size)
        .max_frame_size(settings.max_frame_size)
}

async fn run_session(socket: WebSocket, state: AppState, user: UserSummary, kind: SessionKind) {
    let gateway = Arc::clone(&state.gateway);
    let (mut session, mut rx) = Session::new(user, kind);
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!(session_id = %session.id, user_id = session.user.id, "New WebSocket connection");

    // Forward queued events to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize event");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    if let Err(e) = gateway.activate(&mut session).await {
        tracing::warn!(session_id = %session.id, error = %e, "Session activation failed");
        gateway.close(&mut session).await;
        send_task.abort();
        return;
    }

    let idle = Duration::from_secs(state.settings.websocket.idle_timeout_secs);
    {
        let reader = receive_loop(&gateway, &mut session, &mut receiver, idle);
        tokio::pin!(reader);

        // Dropping the reader aborts any handler still in flight.
        tokio::select! {
            _ = &mut reader => {}
            _ = &mut send_task => {
                tracing::debug!("Writer finished, closing session");
            }
        }
    }

    gateway.close(&mut session).await;
    send_task.abort();
}

async fn receive_loop(
    gateway: &Gateway,
    session: &mut Session,
    receiver: &mut SplitStream<WebSocket>,
    idle: Duration,
) {
    loop {
        let next = if idle.is_zero() {
            receiver.next().await
        } else {
            match timeout(idle, receiver.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::info!(session_id = %session.id, "Idle timeout, closing connection");
                    break;
                }
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                gateway.handle_frame(session, text.as_str()).await;
            }
            Some(Ok(Message::Binary(_))) => {
                tracing::debug!(session_id = %session.id, "Dropping binary frame");
            }
            Some(Ok(Message::Close(_))) | None => {
                tracing::debug!(session_id = %session.id, "Connection closed");
                break;
            }
            Some(Ok(_)) => {
                // Ping/pong is answered by axum
            }
            Some(Err(e)) => {
                tracing::debug!(session_id = %session.id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}
