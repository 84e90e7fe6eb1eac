//! WebSocket Gateway
//!
//! Owns the session lifecycle: handshake authorization, activation, event
//! handling and close. Sessions themselves are owned by their connection
//! task and passed in by `&mut`, so a session's events are processed one at
//! a time while different sessions run concurrently.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;

use super::registry::GroupRegistry;
use super::router;
use super::session::{Session, SessionId, SessionKind, SessionState};
use crate::application::handlers::call::leave_announcement;
use crate::application::{Fanout, PresenceChange, PresenceTracker, PresenceTransition, ServerEvent};
use crate::config::WebSocketSettings;
use crate::domain::{GroupName, StorageGateway, UserSummary};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// What a notification session replays on activation.
#[derive(Debug, Clone, Copy)]
pub struct NotificationOptions {
    pub lookback: Duration,
    pub limit: i64,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            lookback: Duration::hours(24),
            limit: 10,
        }
    }
}

impl From<&WebSocketSettings> for NotificationOptions {
    fn from(settings: &WebSocketSettings) -> Self {
        Self {
            lookback: Duration::hours(settings.notification_lookback_hours),
            limit: settings.notification_limit,
        }
    }
}

pub struct Gateway {
    storage: Arc<dyn StorageGateway>,
    registry: Arc<GroupRegistry>,
    presence: PresenceTracker,
    /// Active sessions by id
    sessions: DashMap<SessionId, SessionKind>,
    notifications: NotificationOptions,
}

impl Gateway {
    pub fn new(
        storage: Arc<dyn StorageGateway>,
        registry: Arc<GroupRegistry>,
        notifications: NotificationOptions,
    ) -> Self {
        Self {
            presence: PresenceTracker::new(Arc::clone(&storage)),
            storage,
            registry,
            sessions: DashMap::new(),
            notifications,
        }
    }

    pub fn storage(&self) -> &dyn StorageGateway {
        self.storage.as_ref()
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Resolve an authenticated user id to a known user.
    pub async fn authorize_user(&self, user_id: i64) -> Result<UserSummary, AppError> {
        self.storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".into()))
    }

    /// Handshake check for a chat session: known user, existing room,
    /// participant of that room.
    pub async fn authorize_chat(&self, user_id: i64, room_id: i64) -> Result<UserSummary, AppError> {
        let user = self.authorize_user(user_id).await?;
        let room = self.storage.get_room(room_id).await?;
        if !room.is_active {
            return Err(AppError::NotFound(format!("Room {} not found", room_id)));
        }
        if !self.storage.is_participant(room_id, user_id).await? {
            return Err(AppError::PermissionDenied(
                "You are not a participant of this room".into(),
            ));
        }
        Ok(user)
    }

    /// Move a session from `Connecting` to `Active`.
    pub async fn activate(&self, session: &mut Session) -> Result<(), AppError> {
        if session.state() != SessionState::Connecting {
            return Err(AppError::InvalidArgument("Session already activated".into()));
        }

        match session.kind {
            SessionKind::Chat { room_id } => self.activate_chat(session, room_id).await?,
            SessionKind::Notifications => self.activate_notifications(session).await,
        }

        self.sessions.insert(session.id, session.kind);
        metrics::session_opened(session.kind.label());
        tracing::info!(
            session_id = %session.id,
            user_id = session.user.id,
            kind = session.kind.label(),
            "Session active"
        );
        Ok(())
    }

    async fn activate_chat(&self, session: &mut Session, room_id: i64) -> Result<(), AppError> {
        // Membership may have changed between handshake and upgrade.
        if !self.storage.is_participant(room_id, session.user.id).await? {
            return Err(AppError::PermissionDenied(
                "You are not a participant of this room".into(),
            ));
        }

        self.subscribe(session, GroupName::Room(room_id));
        self.subscribe(session, GroupName::User(session.user.id));
        session.set_state(SessionState::Active);

        let transition = self.presence.on_connect(session.user.id).await;
        self.broadcast_presence(&session.user, &transition).await;
        drop(transition);

        self.publish(Fanout::to(
            GroupName::Room(room_id),
            ServerEvent::UserJoined {
                user_id: session.user.id,
                username: session.user.display_name.clone(),
                timestamp: Utc::now(),
            },
        ));

        match self.storage.get_online_participants(room_id).await {
            Ok(users) => {
                session.send(ServerEvent::OnlineUsers {
                    room_id,
                    users,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id, room_id, error = %e, "Failed to load online users");
            }
        }
        Ok(())
    }

    async fn activate_notifications(&self, session: &mut Session) {
        self.subscribe(session, GroupName::User(session.user.id));
        session.set_state(SessionState::Active);

        let since = Utc::now() - self.notifications.lookback;
        let pending = match self
            .storage
            .unread_messages_for(session.user.id, since, self.notifications.limit)
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "Failed to load pending notifications");
                return;
            }
        };

        tracing::debug!(session_id = %session.id, count = pending.len(), "Sending pending notifications");
        for unread in pending {
            session.send(ServerEvent::Notification {
                message_id: unread.message.id,
                room_id: unread.room.id,
                room_name: unread.room.label_for(&unread.sender_name),
                message_preview: unread.message.preview(),
                sender: unread.sender_name,
                timestamp: unread.message.created_at,
            });
        }
    }

    /// Handle one inbound text frame.
    pub async fn handle_frame(&self, session: &mut Session, text: &str) {
        if !session.is_active() {
            return;
        }
        router::dispatch(self, session, text).await;
    }

    /// Tear a session down. Safe to call more than once; only the first call
    /// has any effect.
    pub async fn close(&self, session: &mut Session) {
        let previous = session.state();
        if previous == SessionState::Closed {
            return;
        }
        session.set_state(SessionState::Closed);

        for group in session.take_groups() {
            self.registry.unsubscribe(group, session.id);
        }

        if previous != SessionState::Active {
            tracing::debug!(session_id = %session.id, "Closed before activation");
            return;
        }

        self.sessions.remove(&session.id);
        metrics::session_closed(session.kind.label());

        if let SessionKind::Chat { room_id } = session.kind {
            if let Some(call_room) = session.active_call() {
                session.set_active_call(None);
                self.publish(leave_announcement(
                    session.id,
                    session.user.id,
                    &session.user.display_name,
                    call_room,
                ));
            }

            let transition = self.presence.on_disconnect(session.user.id).await;
            self.broadcast_presence(&session.user, &transition).await;
            drop(transition);

            self.publish(Fanout::to(
                GroupName::Room(room_id),
                ServerEvent::UserLeft {
                    user_id: session.user.id,
                    username: session.user.display_name.clone(),
                    timestamp: Utc::now(),
                },
            ));
        }

        tracing::info!(
            session_id = %session.id,
            user_id = session.user.id,
            kind = session.kind.label(),
            "Session closed"
        );
    }

    /// Publish one fanout through the registry.
    pub fn publish(&self, fanout: Fanout) -> usize {
        self.registry
            .publish(fanout.group, fanout.event, fanout.exclude_session)
    }

    pub(crate) fn subscribe(&self, session: &mut Session, group: GroupName) {
        if session.track_group(group) {
            self.registry.subscribe(group, session.sink());
        }
    }

    pub(crate) fn unsubscribe(&self, session: &mut Session, group: GroupName) {
        if session.untrack_group(&group) {
            self.registry.unsubscribe(group, session.id);
        }
    }

    /// Announce an online/offline transition to every room the user is in.
    ///
    /// Runs while the transition still holds the user's presence lock, so a
    /// later connect or disconnect cannot be announced ahead of this one.
    async fn broadcast_presence(&self, user: &UserSummary, transition: &PresenceTransition) {
        let online = match transition.change() {
            PresenceChange::WentOnline => true,
            PresenceChange::WentOffline => false,
            PresenceChange::Unchanged => return,
        };

        let rooms = match self.storage.rooms_for_user(user.id).await {
            Ok(rooms) => rooms,
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "Failed to load rooms for presence");
                return;
            }
        };

        let last_seen = if online {
            None
        } else {
            match self.storage.get_presence(user.id).await {
                Ok(presence) => presence.last_seen.or_else(|| Some(Utc::now())),
                Err(_) => Some(Utc::now()),
            }
        };

        let timestamp = Utc::now();
        for room_id in rooms {
            self.publish(Fanout::to(
                GroupName::Room(room_id),
                ServerEvent::Presence {
                    user_id: user.id,
                    username: user.display_name.clone(),
                    online,
                    last_seen,
                    timestamp,
                },
            ));
        }
    }
}
