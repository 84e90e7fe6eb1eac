//! Chat room entity.
//!
//! Maps to the `rooms` table. Participants live in `room_participants` and are
//! always queried through the storage gateway, never cached on the entity.

use serde::{Deserialize, Serialize};

/// Room kinds matching the `room_kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    /// One-to-one conversation
    #[default]
    Direct,
    /// Multi-user conversation with an optional admin
    Group,
}

impl RoomKind {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "group" => Self::Group,
            _ => Self::Direct,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Group => "group",
        }
    }
}

/// Represents a chat room.
///
/// Maps to the `rooms` table:
/// - id: BIGINT PRIMARY KEY
/// - name: VARCHAR(255) NULL
/// - room_kind: VARCHAR(10) NOT NULL DEFAULT 'direct'
/// - admin_id: BIGINT NULL REFERENCES users(id)
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Room {
    pub id: i64,
    pub name: Option<String>,
    pub kind: RoomKind,
    pub admin_id: Option<i64>,
    pub is_active: bool,
}

impl Room {
    /// Check whether `user_id` administers this room.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id == Some(user_id)
    }

    pub fn is_group(&self) -> bool {
        self.kind == RoomKind::Group
    }

    /// Name shown in notifications. Unnamed rooms are labelled after the sender.
    pub fn label_for(&self, sender_name: &str) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("Chat with {}", sender_name),
        }
    }
}

impl Default for Room {
    fn default() -> Self {
        Self {
            id: 0,
            name: None,
            kind: RoomKind::default(),
            admin_id: None,
            is_active: true,
        }
    }
}
