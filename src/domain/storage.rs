//! Storage gateway contract.
//!
//! The realtime core never touches the database directly. Every read and
//! mutation goes through this trait so the hub can run against Postgres in
//! production and an in-memory store in tests. Each call is one logical
//! mutation; there are no cross-call transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{
    Message, NewMessage, OnlineParticipant, Presence, ReactionKind, ReactionOutcome, Room,
    UnreadMessage, UserSummary,
};
use crate::shared::error::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Look up a user's identity. `None` when the account does not exist.
    async fn get_user(&self, user_id: i64) -> Result<Option<UserSummary>, AppError>;

    /// Fetch a room. Missing or inactive rooms are `NotFound`.
    async fn get_room(&self, room_id: i64) -> Result<Room, AppError>;

    async fn is_participant(&self, room_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// User ids of every participant of a room.
    async fn list_participants(&self, room_id: i64) -> Result<Vec<i64>, AppError>;

    /// Ids of every active room the user participates in.
    async fn rooms_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError>;

    async fn create_message(&self, new: NewMessage) -> Result<Message, AppError>;

    /// Fetch a message, optionally scoped to a room. A message outside the
    /// given room is `NotFound`.
    async fn get_message(&self, message_id: i64, room_id: Option<i64>)
        -> Result<Message, AppError>;

    /// Mark a message read. Returns false when it was already read.
    async fn mark_read(&self, message_id: i64) -> Result<bool, AppError>;

    /// Scrub content and release the attachment. The row is kept.
    /// Returns false when the message was already deleted.
    async fn soft_delete(&self, message_id: i64) -> Result<bool, AppError>;

    /// Flip the pinned flag in one step and return the new state.
    async fn toggle_pinned(&self, message_id: i64) -> Result<bool, AppError>;

    /// Replace the content and record the edit time.
    async fn edit_content(&self, message_id: i64, content: &str) -> Result<(), AppError>;

    /// Apply the toggle rule for one (message, user) pair atomically.
    async fn upsert_reaction(
        &self,
        message_id: i64,
        user_id: i64,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome, AppError>;

    /// Persist an online/offline transition. Going online records
    /// `last_online`, going offline records `last_seen`.
    async fn set_presence(&self, user_id: i64, online: bool) -> Result<(), AppError>;

    async fn get_presence(&self, user_id: i64) -> Result<Presence, AppError>;

    async fn get_online_participants(
        &self,
        room_id: i64,
    ) -> Result<Vec<OnlineParticipant>, AppError>;

    /// Unread, non-deleted messages in the user's rooms newer than `since`
    /// and not sent by the user, newest first.
    async fn unread_messages_for(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UnreadMessage>, AppError>;

    /// Case-insensitive content search within a room. Soft-deleted messages never match.
    async fn search_messages(
        &self,
        room_id: i64,
        query: &str,
        limit: i64,
    ) -> Result<Vec<Message>, AppError>;

    /// Unread messages in a room sent by someone other than `user_id`,
    /// excluding soft-deleted ones.
    async fn unread_count(&self, room_id: i64, user_id: i64) -> Result<i64, AppError>;
}
