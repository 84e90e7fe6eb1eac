//! In-memory Storage Gateway
//!
//! Backs tests and local development. All state lives behind one
//! `parking_lot` lock and every trait call takes it exactly once, which gives
//! each call the same single-mutation atomicity the Postgres gateway has.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{
    Message, NewMessage, OnlineParticipant, Presence, ReactionKind, ReactionOutcome, Room,
    RoomKind, StorageGateway, UnreadMessage, UserSummary,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[derive(Default)]
struct State {
    users: HashMap<i64, UserSummary>,
    presence: HashMap<i64, Presence>,
    rooms: HashMap<i64, Room>,
    participants: HashMap<i64, HashSet<i64>>,
    messages: BTreeMap<i64, Message>,
    reactions: HashMap<(i64, i64), ReactionKind>,
}

/// [`StorageGateway`] kept entirely in process memory.
pub struct InMemoryStorage {
    state: RwLock<State>,
    ids: SnowflakeGenerator,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            ids: SnowflakeGenerator::new(0),
        }
    }

    pub fn add_user(&self, id: i64, display_name: &str) {
        let mut state = self.state.write();
        state.users.insert(id, UserSummary::new(id, display_name));
        state.presence.entry(id).or_insert_with(|| Presence {
            user_id: id,
            ..Default::default()
        });
    }

    pub fn add_room(
        &self,
        id: i64,
        name: Option<&str>,
        kind: RoomKind,
        admin_id: Option<i64>,
        participants: &[i64],
    ) {
        let mut state = self.state.write();
        state.rooms.insert(
            id,
            Room {
                id,
                name: name.map(str::to_string),
                kind,
                admin_id,
                is_active: true,
            },
        );
        state
            .participants
            .insert(id, participants.iter().copied().collect());
    }

    pub fn add_participant(&self, room_id: i64, user_id: i64) {
        self.state
            .write()
            .participants
            .entry(room_id)
            .or_default()
            .insert(user_id);
    }

    pub fn remove_participant(&self, room_id: i64, user_id: i64) {
        if let Some(members) = self.state.write().participants.get_mut(&room_id) {
            members.remove(&user_id);
        }
    }

    /// Messages of a room in creation order.
    pub fn messages_in(&self, room_id: i64) -> Vec<Message> {
        self.state
            .read()
            .messages
            .values()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect()
    }

    pub fn reaction_count(&self, message_id: i64) -> usize {
        self.state
            .read()
            .reactions
            .keys()
            .filter(|(m, _)| *m == message_id)
            .count()
    }

    pub fn reaction_of(&self, message_id: i64, user_id: i64) -> Option<ReactionKind> {
        self.state.read().reactions.get(&(message_id, user_id)).copied()
    }

    /// Backdate a message; used to exercise time-window queries.
    pub fn set_created_at(&self, message_id: i64, created_at: DateTime<Utc>) {
        if let Some(message) = self.state.write().messages.get_mut(&message_id) {
            message.created_at = created_at;
        }
    }
}

impl State {
    fn active_room(&self, room_id: i64) -> Result<&Room, AppError> {
        self.rooms
            .get(&room_id)
            .filter(|room| room.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))
    }

    fn message_mut(&mut self, message_id: i64) -> Result<&mut Message, AppError> {
        self.messages
            .get_mut(&message_id)
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))
    }

    fn is_participant(&self, room_id: i64, user_id: i64) -> bool {
        self.participants
            .get(&room_id)
            .map(|members| members.contains(&user_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl StorageGateway for InMemoryStorage {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserSummary>, AppError> {
        Ok(self.state.read().users.get(&user_id).cloned())
    }

    async fn get_room(&self, room_id: i64) -> Result<Room, AppError> {
        self.state.read().active_room(room_id).cloned()
    }

    async fn is_participant(&self, room_id: i64, user_id: i64) -> Result<bool, AppError> {
        Ok(self.state.read().is_participant(room_id, user_id))
    }

    async fn list_participants(&self, room_id: i64) -> Result<Vec<i64>, AppError> {
        let state = self.state.read();
        let mut ids: Vec<i64> = state
            .participants
            .get(&room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn rooms_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let state = self.state.read();
        let mut ids: Vec<i64> = state
            .participants
            .iter()
            .filter(|(room_id, members)| {
                members.contains(&user_id) && state.active_room(**room_id).is_ok()
            })
            .map(|(room_id, _)| *room_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn create_message(&self, new: NewMessage) -> Result<Message, AppError> {
        let mut state = self.state.write();
        state.active_room(new.room_id)?;

        let message = Message::from_new(self.ids.generate(), new, Utc::now());
        state.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn get_message(
        &self,
        message_id: i64,
        room_id: Option<i64>,
    ) -> Result<Message, AppError> {
        self.state
            .read()
            .messages
            .get(&message_id)
            .filter(|m| room_id.map_or(true, |room| m.room_id == room))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))
    }

    async fn mark_read(&self, message_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.write();
        Ok(state.message_mut(message_id)?.mark_read(Utc::now()))
    }

    async fn soft_delete(&self, message_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.write();
        let message = state.message_mut(message_id)?;
        if message.is_deleted {
            return Ok(false);
        }
        message.soft_delete();
        Ok(true)
    }

    async fn toggle_pinned(&self, message_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.write();
        let message = state.message_mut(message_id)?;
        if message.is_deleted {
            return Err(AppError::NotFound(format!(
                "Message {} not found or deleted",
                message_id
            )));
        }
        message.pinned = !message.pinned;
        Ok(message.pinned)
    }

    async fn edit_content(&self, message_id: i64, content: &str) -> Result<(), AppError> {
        let mut state = self.state.write();
        let message = state.message_mut(message_id)?;
        if message.is_deleted {
            return Err(AppError::PermissionDenied(
                "Deleted messages cannot be edited".into(),
            ));
        }
        message.content = content.to_string();
        message.edited_at = Some(Utc::now());
        Ok(())
    }

    async fn upsert_reaction(
        &self,
        message_id: i64,
        user_id: i64,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome, AppError> {
        let mut state = self.state.write();
        state.message_mut(message_id)?;

        let existing = state.reactions.get(&(message_id, user_id)).copied();
        let outcome = ReactionOutcome::resolve(message_id, user_id, existing, kind);

        match &outcome {
            ReactionOutcome::Removed { .. } => {
                state.reactions.remove(&(message_id, user_id));
            }
            ReactionOutcome::Added(reaction) | ReactionOutcome::Changed { reaction, .. } => {
                state.reactions.insert((message_id, user_id), reaction.kind);
            }
        }
        Ok(outcome)
    }

    async fn set_presence(&self, user_id: i64, online: bool) -> Result<(), AppError> {
        let mut state = self.state.write();
        state
            .presence
            .entry(user_id)
            .or_insert_with(|| Presence {
                user_id,
                ..Default::default()
            })
            .apply(online, Utc::now());
        Ok(())
    }

    async fn get_presence(&self, user_id: i64) -> Result<Presence, AppError> {
        Ok(self
            .state
            .read()
            .presence
            .get(&user_id)
            .cloned()
            .unwrap_or(Presence {
                user_id,
                ..Default::default()
            }))
    }

    async fn get_online_participants(
        &self,
        room_id: i64,
    ) -> Result<Vec<OnlineParticipant>, AppError> {
        let state = self.state.read();
        let mut online: Vec<OnlineParticipant> = state
            .participants
            .get(&room_id)
            .into_iter()
            .flatten()
            .filter(|id| state.presence.get(*id).map(|p| p.online).unwrap_or(false))
            .filter_map(|id| state.users.get(id))
            .map(|user| OnlineParticipant {
                user_id: user.id,
                display_name: user.display_name.clone(),
            })
            .collect();
        online.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(online)
    }

    async fn unread_messages_for(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UnreadMessage>, AppError> {
        let state = self.state.read();
        let mut unread: Vec<UnreadMessage> = state
            .messages
            .values()
            .filter(|m| {
                !m.is_read
                    && m.is_visible()
                    && m.sender_id != user_id
                    && m.created_at >= since
                    && state.is_participant(m.room_id, user_id)
            })
            .filter_map(|m| {
                let room = state.active_room(m.room_id).ok()?;
                let sender_name = state.users.get(&m.sender_id)?.display_name.clone();
                Some(UnreadMessage {
                    message: m.clone(),
                    room: room.clone(),
                    sender_name,
                })
            })
            .collect();

        unread.sort_by(|a, b| b.message.created_at.cmp(&a.message.created_at));
        unread.truncate(limit.max(0) as usize);
        Ok(unread)
    }

    async fn search_messages(
        &self,
        room_id: i64,
        query: &str,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let needle = query.to_lowercase();
        let mut found: Vec<Message> = self
            .state
            .read()
            .messages
            .values()
            .filter(|m| {
                m.room_id == room_id && m.is_visible() && m.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();

        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit.clamp(1, 100) as usize);
        Ok(found)
    }

    async fn unread_count(&self, room_id: i64, user_id: i64) -> Result<i64, AppError> {
        let count = self
            .state
            .read()
            .messages
            .values()
            .filter(|m| {
                m.room_id == room_id && m.sender_id != user_id && !m.is_read && m.is_visible()
            })
            .count();
        Ok(count as i64)
    }
}
