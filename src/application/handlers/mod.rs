//! # Event Handlers
//!
//! One async function per inbound event kind. Each handler re-reads the room
//! and message state it needs, performs at most one logical mutation through
//! the storage gateway, and returns an [`Outcome`](crate::application::Outcome)
//! describing the fanout. Handlers never publish.
//!
//! - **message**: send, read receipt, delete, pin, edit
//! - **forward**: forward a message to other rooms
//! - **reaction**: reaction toggle
//! - **typing**: typing indicator
//! - **call**: call membership and signaling relay

pub mod call;
pub mod forward;
pub mod message;
pub mod reaction;
pub mod typing;

use crate::application::SessionId;
use crate::domain::{StorageGateway, UserSummary};
use crate::shared::error::AppError;

/// Per-event view of the calling session.
pub struct Context<'a> {
    pub storage: &'a dyn StorageGateway,
    pub user: &'a UserSummary,
    /// Connection the event arrived on
    pub session_id: SessionId,
    /// Room the session is bound to
    pub room_id: i64,
    /// Room whose call the session joined, if any
    pub active_call: Option<i64>,
}

impl<'a> Context<'a> {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    /// Membership is re-read on every event; nothing is cached.
    pub async fn ensure_participant(&self) -> Result<(), AppError> {
        if self.storage.is_participant(self.room_id, self.user.id).await? {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "You are not a participant of this room".into(),
            ))
        }
    }
}
