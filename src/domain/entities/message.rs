//! Message entity.
//!
//! Maps to the `messages` table in the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content stored in place of a soft-deleted message.
pub const DELETED_PLACEHOLDER: &str = "[Deleted message]";

/// Prefix added to the content of forwarded copies.
pub const FORWARD_PREFIX: &str = "Forwarded: ";

/// Length of the preview carried by personal notifications, in characters.
pub const PREVIEW_CHARS: usize = 50;

/// Message kinds matching the `message_kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
    Voice,
    /// Generated by the server (participant added/removed). Clients cannot send it.
    System,
}

impl MessageKind {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "image" => Self::Image,
            "file" => Self::File,
            "voice" => Self::Voice,
            "system" => Self::System,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::Voice => "voice",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a message in a room.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - room_id: BIGINT NOT NULL REFERENCES rooms(id)
/// - sender_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL
/// - message_kind: VARCHAR(10) NOT NULL DEFAULT 'text'
/// - attachment: VARCHAR(512) NULL
/// - reply_to_id: BIGINT NULL REFERENCES messages(id) ON DELETE SET NULL
/// - forwarded_from_id: BIGINT NULL REFERENCES messages(id) ON DELETE SET NULL
/// - is_read / read_at, is_deleted, pinned, edited_at, created_at
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub kind: MessageKind,
    /// Reference to an uploaded file, released on soft delete
    pub attachment: Option<String>,
    pub reply_to_id: Option<i64>,
    pub forwarded_from_id: Option<i64>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub pinned: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a fresh message row from a creation request.
    pub fn from_new(id: i64, new: NewMessage, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            room_id: new.room_id,
            sender_id: new.sender_id,
            content: new.content,
            kind: new.kind,
            attachment: new.attachment,
            reply_to_id: new.reply_to_id,
            forwarded_from_id: new.forwarded_from_id,
            is_read: false,
            read_at: None,
            is_deleted: false,
            pinned: false,
            edited_at: None,
            created_at,
        }
    }

    pub fn is_forwarded(&self) -> bool {
        self.forwarded_from_id.is_some()
    }

    /// First [`PREVIEW_CHARS`] characters of the content.
    pub fn preview(&self) -> String {
        self.content.chars().take(PREVIEW_CHARS).collect()
    }

    /// Mark as read. Returns false when the message was already read.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(at);
        true
    }

    /// Scrub content and attachment; the row itself stays.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
        self.content = DELETED_PLACEHOLDER.to_string();
        self.attachment = None;
    }

    /// Whether the message counts towards search results and unread counters.
    pub fn is_visible(&self) -> bool {
        !self.is_deleted
    }
}

/// Data needed to create a message. The storage gateway assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub kind: MessageKind,
    pub attachment: Option<String>,
    pub reply_to_id: Option<i64>,
    pub forwarded_from_id: Option<i64>,
}

impl NewMessage {
    /// A forwarded copy of `original` placed in `room_id`.
    pub fn forwarded(original: &Message, room_id: i64, sender_id: i64) -> Self {
        Self {
            room_id,
            sender_id,
            content: format!("{}{}", FORWARD_PREFIX, original.content),
            kind: original.kind,
            attachment: None,
            reply_to_id: None,
            forwarded_from_id: Some(original.id),
        }
    }
}

/// An unread message joined with the names needed to render a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadMessage {
    pub message: Message,
    pub room: super::Room,
    pub sender_name: String,
}
