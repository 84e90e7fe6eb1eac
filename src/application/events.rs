//! Wire events
//!
//! Inbound frames are JSON objects tagged by `type`. Outbound events carry the
//! same `type` tag plus a server-assigned `timestamp`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::{MessageKind, OnlineParticipant, ReactionKind};
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;

/// Maximum length of message content, in characters.
pub const MAX_CONTENT_CHARS: u64 = 4000;

/// Every inbound event kind the hub understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ChatMessage,
    Typing,
    ReadReceipt,
    Reaction,
    DeleteMessage,
    PinMessage,
    EditMessage,
    ForwardMessage,
    CallOffer,
    CallAnswer,
    CallIce,
    CallJoin,
    CallLeave,
    Call,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::ChatMessage,
        EventKind::Typing,
        EventKind::ReadReceipt,
        EventKind::Reaction,
        EventKind::DeleteMessage,
        EventKind::PinMessage,
        EventKind::EditMessage,
        EventKind::ForwardMessage,
        EventKind::CallOffer,
        EventKind::CallAnswer,
        EventKind::CallIce,
        EventKind::CallJoin,
        EventKind::CallLeave,
        EventKind::Call,
    ];

    /// The wire `type` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatMessage => "chat_message",
            Self::Typing => "typing",
            Self::ReadReceipt => "read_receipt",
            Self::Reaction => "reaction",
            Self::DeleteMessage => "delete_message",
            Self::PinMessage => "pin_message",
            Self::EditMessage => "edit_message",
            Self::ForwardMessage => "forward_message",
            Self::CallOffer => "call.offer",
            Self::CallAnswer => "call.answer",
            Self::CallIce => "call.ice",
            Self::CallJoin => "call.join",
            Self::CallLeave => "call.leave",
            Self::Call => "call",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Best-effort kinds never produce an error frame; failures are dropped.
    pub fn is_best_effort(&self) -> bool {
        matches!(
            self,
            Self::Typing
                | Self::CallOffer
                | Self::CallAnswer
                | Self::CallIce
                | Self::CallJoin
                | Self::CallLeave
                | Self::Call
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Inbound payloads

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatMessagePayload {
    #[serde(default, alias = "message")]
    #[validate(length(max = 4000))]
    pub content: String,
    #[serde(default, rename = "message_type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub reply_to: Option<i64>,
    #[serde(default)]
    #[validate(length(max = 512))]
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypingPayload {
    #[serde(default)]
    pub is_typing: bool,
}

/// Payload of events that target a single message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub message_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionPayload {
    pub message_id: i64,
    /// Kept as a string so unknown values surface as `invalid_reaction`
    pub reaction: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EditPayload {
    pub message_id: i64,
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForwardPayload {
    pub message_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub rooms: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallOfferPayload {
    pub offer: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallAnswerPayload {
    pub answer: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallIcePayload {
    pub candidate: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    #[default]
    Voice,
    Video,
}

/// Ringing state of a call, announced to the whole room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallAction {
    Start,
    Answer,
    End,
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallNoticePayload {
    #[serde(default)]
    pub call_type: CallType,
    pub action: CallAction,
}

/// Decoded inbound event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "chat_message")]
    ChatMessage(ChatMessagePayload),
    #[serde(rename = "typing")]
    Typing(TypingPayload),
    #[serde(rename = "read_receipt")]
    ReadReceipt(MessageRef),
    #[serde(rename = "reaction")]
    Reaction(ReactionPayload),
    #[serde(rename = "delete_message")]
    DeleteMessage(MessageRef),
    #[serde(rename = "pin_message")]
    PinMessage(MessageRef),
    #[serde(rename = "edit_message")]
    EditMessage(EditPayload),
    #[serde(rename = "forward_message")]
    ForwardMessage(ForwardPayload),
    #[serde(rename = "call.offer")]
    CallOffer(CallOfferPayload),
    #[serde(rename = "call.answer")]
    CallAnswer(CallAnswerPayload),
    #[serde(rename = "call.ice")]
    CallIce(CallIcePayload),
    #[serde(rename = "call.join")]
    CallJoin {},
    #[serde(rename = "call.leave")]
    CallLeave {},
    #[serde(rename = "call")]
    Call(CallNoticePayload),
}

impl ClientEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ChatMessage(_) => EventKind::ChatMessage,
            Self::Typing(_) => EventKind::Typing,
            Self::ReadReceipt(_) => EventKind::ReadReceipt,
            Self::Reaction(_) => EventKind::Reaction,
            Self::DeleteMessage(_) => EventKind::DeleteMessage,
            Self::PinMessage(_) => EventKind::PinMessage,
            Self::EditMessage(_) => EventKind::EditMessage,
            Self::ForwardMessage(_) => EventKind::ForwardMessage,
            Self::CallOffer(_) => EventKind::CallOffer,
            Self::CallAnswer(_) => EventKind::CallAnswer,
            Self::CallIce(_) => EventKind::CallIce,
            Self::CallJoin {} => EventKind::CallJoin,
            Self::CallLeave {} => EventKind::CallLeave,
            Self::Call(_) => EventKind::Call,
        }
    }

    /// Run field-level validation on the payload.
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            Self::ChatMessage(payload) => payload.validate().map_err(validation_error),
            Self::EditMessage(payload) => payload.validate().map_err(validation_error),
            Self::ForwardMessage(payload) => payload.validate().map_err(validation_error),
            _ => Ok(()),
        }
    }
}

// Outbound events

/// Event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ChatMessage {
        message_id: i64,
        room_id: i64,
        sender_id: i64,
        sender: String,
        content: String,
        message_type: MessageKind,
        reply_to: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        attachment: Option<String>,
        timestamp: DateTime<Utc>,
    },
    Notification {
        message_id: i64,
        room_id: i64,
        room_name: String,
        sender: String,
        message_preview: String,
        timestamp: DateTime<Utc>,
    },
    Typing {
        user_id: i64,
        username: String,
        is_typing: bool,
        timestamp: DateTime<Utc>,
    },
    ReadReceipt {
        message_id: i64,
        user_id: i64,
        username: String,
        timestamp: DateTime<Utc>,
    },
    MessageReaction {
        message_id: i64,
        user_id: i64,
        username: String,
        reaction: ReactionKind,
        emoji: String,
        timestamp: DateTime<Utc>,
    },
    MessageReactionRemoved {
        message_id: i64,
        user_id: i64,
        username: String,
        reaction: ReactionKind,
        timestamp: DateTime<Utc>,
    },
    MessageDeleted {
        message_id: i64,
        deleted_by: i64,
        timestamp: DateTime<Utc>,
    },
    MessagePinned {
        message_id: i64,
        pinned: bool,
        pinned_by: i64,
        timestamp: DateTime<Utc>,
    },
    MessageEdited {
        message_id: i64,
        content: String,
        edited_by: i64,
        timestamp: DateTime<Utc>,
    },
    MessageForwarded {
        message_id: i64,
        rooms: Vec<i64>,
        skipped: Vec<i64>,
        timestamp: DateTime<Utc>,
    },
    UserJoined {
        user_id: i64,
        username: String,
        timestamp: DateTime<Utc>,
    },
    UserLeft {
        user_id: i64,
        username: String,
        timestamp: DateTime<Utc>,
    },
    OnlineUsers {
        room_id: i64,
        users: Vec<OnlineParticipant>,
        timestamp: DateTime<Utc>,
    },
    Presence {
        user_id: i64,
        username: String,
        online: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen: Option<DateTime<Utc>>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "call.offer")]
    CallOffer {
        user_id: i64,
        username: String,
        offer: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "call.answer")]
    CallAnswer {
        user_id: i64,
        username: String,
        answer: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "call.ice")]
    CallIce {
        user_id: i64,
        username: String,
        candidate: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "call.join")]
    CallJoin {
        user_id: i64,
        username: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "call.leave")]
    CallLeave {
        user_id: i64,
        username: String,
        timestamp: DateTime<Utc>,
    },
    CallEvent {
        user_id: i64,
        username: String,
        call_type: CallType,
        action: CallAction,
        timestamp: DateTime<Utc>,
    },
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_type: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    /// The wire `type` tag, used for logging and metrics.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ChatMessage { .. } => "chat_message",
            Self::Notification { .. } => "notification",
            Self::Typing { .. } => "typing",
            Self::ReadReceipt { .. } => "read_receipt",
            Self::MessageReaction { .. } => "message_reaction",
            Self::MessageReactionRemoved { .. } => "message_reaction_removed",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::MessagePinned { .. } => "message_pinned",
            Self::MessageEdited { .. } => "message_edited",
            Self::MessageForwarded { .. } => "message_forwarded",
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::OnlineUsers { .. } => "online_users",
            Self::Presence { .. } => "presence",
            Self::CallOffer { .. } => "call.offer",
            Self::CallAnswer { .. } => "call.answer",
            Self::CallIce { .. } => "call.ice",
            Self::CallJoin { .. } => "call.join",
            Self::CallLeave { .. } => "call.leave",
            Self::CallEvent { .. } => "call_event",
            Self::Error { .. } => "error",
        }
    }

    /// Structured error frame for the sender of a rejected request.
    pub fn error(err: &AppError, request_type: Option<EventKind>) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.public_message(),
            request_type: request_type.map(|kind| kind.as_str().to_string()),
            timestamp: Utc::now(),
        }
    }

    /// Serialize to the JSON text sent on the socket.
    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Internal(format!("Failed to encode {}: {}", self.event_name(), e)))
    }
}
