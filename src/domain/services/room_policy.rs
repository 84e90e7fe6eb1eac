//! Authorization rules for message operations.
//!
//! All checks run against a freshly fetched room and message; nothing here
//! caches membership or admin state.

use crate::domain::entities::{Message, Room};
use crate::shared::error::AppError;

/// Domain service deciding who may mutate a message.
pub struct RoomPolicy;

impl RoomPolicy {
    /// The author or the room admin may delete.
    pub fn can_delete(room: &Room, message: &Message, user_id: i64) -> bool {
        message.sender_id == user_id || room.is_admin(user_id)
    }

    /// Anyone in a direct room may pin; group rooms require the admin.
    pub fn can_pin(room: &Room, user_id: i64) -> bool {
        !room.is_group() || room.is_admin(user_id)
    }

    /// Only the author may edit, and a soft-deleted message is frozen.
    pub fn can_edit(message: &Message, user_id: i64) -> bool {
        message.sender_id == user_id && !message.is_deleted
    }

    /// Only the author may forward a message.
    pub fn can_forward(message: &Message, user_id: i64) -> bool {
        message.sender_id == user_id
    }

    pub fn ensure_delete(room: &Room, message: &Message, user_id: i64) -> Result<(), AppError> {
        if Self::can_delete(room, message, user_id) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Only the author or the room admin can delete this message".into(),
            ))
        }
    }

    pub fn ensure_pin(room: &Room, user_id: i64) -> Result<(), AppError> {
        if Self::can_pin(room, user_id) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Only the room admin can pin messages in a group".into(),
            ))
        }
    }

    pub fn ensure_edit(message: &Message, user_id: i64) -> Result<(), AppError> {
        if Self::can_edit(message, user_id) {
            Ok(())
        } else if message.is_deleted {
            Err(AppError::PermissionDenied("Deleted messages cannot be edited".into()))
        } else {
            Err(AppError::PermissionDenied("Only the author can edit this message".into()))
        }
    }
}
