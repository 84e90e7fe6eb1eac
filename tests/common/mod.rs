//! Common Test Utilities
//!
//! An in-memory hub with a fixed cast of users and rooms, plus a client
//! wrapper that drives sessions through the gateway exactly like a socket.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response, Router};
use chat_hub::application::ServerEvent;
use chat_hub::config::{
    CorsSettings, DatabaseSettings, JwtSettings, RedisSettings, ServerSettings, Settings,
    SnowflakeSettings, WebSocketSettings,
};
use chat_hub::domain::{
    Message, NewMessage, OnlineParticipant, Presence, ReactionKind, ReactionOutcome, Room,
    RoomKind, StorageGateway, UnreadMessage, UserSummary,
};
use chat_hub::infrastructure::repositories::InMemoryStorage;
use chat_hub::presentation::middleware::Claims;
use chat_hub::presentation::websocket::{Gateway, Session, SessionKind};
use chat_hub::shared::error::AppError;
use chrono::{DateTime, Utc};
use chat_hub::startup::{build_router, AppState};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret-at-least-32-chars";

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;
pub const CAROL: i64 = 3;
pub const DAVE: i64 = 4;

/// Direct room: alice, bob
pub const DIRECT: i64 = 5;
/// Group room "team", admin alice: alice, bob, carol
pub const TEAM: i64 = 6;
/// Direct room: carol, dave
pub const OTHER: i64 = 7;

pub fn settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "postgres://unused".into(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
            run_migrations: false,
        },
        redis: RedisSettings {
            url: None,
            channel_prefix: "test:".into(),
        },
        jwt: JwtSettings {
            secret: SECRET.into(),
        },
        snowflake: SnowflakeSettings { machine_id: 1 },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        websocket: WebSocketSettings {
            max_message_size: 65536,
            max_frame_size: 16384,
            idle_timeout_secs: 0,
            notification_lookback_hours: 24,
            notification_limit: 10,
        },
        environment: "test".into(),
    }
}

pub fn token_for(user_id: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

fn name_of(user_id: i64) -> &'static str {
    match user_id {
        ALICE => "alice",
        BOB => "bob",
        CAROL => "carol",
        DAVE => "dave",
        _ => "ghost",
    }
}

fn seeded_storage() -> Arc<InMemoryStorage> {
    let storage = Arc::new(InMemoryStorage::new());
    for id in [ALICE, BOB, CAROL, DAVE] {
        storage.add_user(id, name_of(id));
    }
    storage.add_room(DIRECT, None, RoomKind::Direct, None, &[ALICE, BOB]);
    storage.add_room(TEAM, Some("team"), RoomKind::Group, Some(ALICE), &[ALICE, BOB, CAROL]);
    storage.add_room(OTHER, None, RoomKind::Direct, None, &[CAROL, DAVE]);
    storage
}

pub struct TestHub {
    pub storage: Arc<InMemoryStorage>,
    pub state: AppState,
}

impl TestHub {
    pub fn new() -> Self {
        let storage = seeded_storage();
        let state = AppState::with_storage(storage.clone(), settings());
        Self { storage, state }
    }

    /// Same cast, but every `rooms_for_user` lookup stalls for `delay`.
    pub fn with_slow_rooms(delay: Duration) -> Self {
        let storage = seeded_storage();
        let slow = Arc::new(SlowRoomsStorage {
            inner: storage.clone(),
            delay,
        });
        let state = AppState::with_storage(slow, settings());
        Self { storage, state }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.state.gateway
    }

    /// Open and activate a chat session.
    pub async fn connect(&self, user_id: i64, room_id: i64) -> Client {
        self.open(user_id, SessionKind::Chat { room_id }).await
    }

    /// Open and activate a notification session.
    pub async fn notifications(&self, user_id: i64) -> Client {
        self.open(user_id, SessionKind::Notifications).await
    }

    async fn open(&self, user_id: i64, kind: SessionKind) -> Client {
        let (mut session, rx) = Session::new(UserSummary::new(user_id, name_of(user_id)), kind);
        self.gateway()
            .activate(&mut session)
            .await
            .expect("session should activate");
        Client { session, rx }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

pub struct Client {
    pub session: Session,
    rx: UnboundedReceiver<Arc<ServerEvent>>,
}

impl Client {
    pub async fn send(&mut self, hub: &TestHub, frame: Value) {
        hub.gateway().handle_frame(&mut self.session, &frame.to_string()).await;
    }

    pub async fn close(&mut self, hub: &TestHub) {
        hub.gateway().close(&mut self.session).await;
    }

    /// Everything queued so far
    pub fn events(&mut self) -> Vec<Arc<ServerEvent>> {
        std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
    }

    pub fn names(&mut self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_name()).collect()
    }

    pub fn clear(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Events as JSON, the way they go out on the socket
    pub fn frames(&mut self) -> Vec<Value> {
        self.events()
            .iter()
            .map(|e| serde_json::to_value(e.as_ref()).unwrap())
            .collect()
    }
}

/// In-memory storage whose room lookup is slow, to widen the window
/// between a presence change and its broadcast.
pub struct SlowRoomsStorage {
    inner: Arc<InMemoryStorage>,
    delay: Duration,
}

#[async_trait]
impl StorageGateway for SlowRoomsStorage {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserSummary>, AppError> {
        self.inner.get_user(user_id).await
    }

    async fn get_room(&self, room_id: i64) -> Result<Room, AppError> {
        self.inner.get_room(room_id).await
    }

    async fn is_participant(&self, room_id: i64, user_id: i64) -> Result<bool, AppError> {
        self.inner.is_participant(room_id, user_id).await
    }

    async fn list_participants(&self, room_id: i64) -> Result<Vec<i64>, AppError> {
        self.inner.list_participants(room_id).await
    }

    async fn rooms_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        tokio::time::sleep(self.delay).await;
        self.inner.rooms_for_user(user_id).await
    }

    async fn create_message(&self, new: NewMessage) -> Result<Message, AppError> {
        self.inner.create_message(new).await
    }

    async fn get_message(
        &self,
        message_id: i64,
        room_id: Option<i64>,
    ) -> Result<Message, AppError> {
        self.inner.get_message(message_id, room_id).await
    }

    async fn mark_read(&self, message_id: i64) -> Result<bool, AppError> {
        self.inner.mark_read(message_id).await
    }

    async fn soft_delete(&self, message_id: i64) -> Result<bool, AppError> {
        self.inner.soft_delete(message_id).await
    }

    async fn toggle_pinned(&self, message_id: i64) -> Result<bool, AppError> {
        self.inner.toggle_pinned(message_id).await
    }

    async fn edit_content(&self, message_id: i64, content: &str) -> Result<(), AppError> {
        self.inner.edit_content(message_id, content).await
    }

    async fn upsert_reaction(
        &self,
        message_id: i64,
        user_id: i64,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome, AppError> {
        self.inner.upsert_reaction(message_id, user_id, kind).await
    }

    async fn set_presence(&self, user_id: i64, online: bool) -> Result<(), AppError> {
        self.inner.set_presence(user_id, online).await
    }

    async fn get_presence(&self, user_id: i64) -> Result<Presence, AppError> {
        self.inner.get_presence(user_id).await
    }

    async fn get_online_participants(
        &self,
        room_id: i64,
    ) -> Result<Vec<OnlineParticipant>, AppError> {
        self.inner.get_online_participants(room_id).await
    }

    async fn unread_messages_for(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UnreadMessage>, AppError> {
        self.inner.unread_messages_for(user_id, since, limit).await
    }

    async fn search_messages(
        &self,
        room_id: i64,
        query: &str,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        self.inner.search_messages(room_id, query, limit).await
    }

    async fn unread_count(&self, room_id: i64, user_id: i64) -> Result<i64, AppError> {
        self.inner.unread_count(room_id, user_id).await
    }
}
