//! # Domain Entities
//!
//! Persisted business objects the hub reads and mutates through the
//! [`StorageGateway`](crate::domain::StorageGateway).
//!
//! - **Room**: a direct or group conversation with an optional admin
//! - **Message**: a chat message with read, pin and soft-delete state
//! - **Reaction**: one reaction per user per message
//! - **UserSummary / Presence**: identity and the online/offline projection

mod message;
mod reaction;
mod room;
mod user;

pub use message::{
    Message, MessageKind, NewMessage, UnreadMessage, DELETED_PLACEHOLDER, FORWARD_PREFIX,
    PREVIEW_CHARS,
};
pub use reaction::{Reaction, ReactionKind, ReactionOutcome};
pub use room::{Room, RoomKind};
pub use user::{OnlineParticipant, Presence, UserSummary};
