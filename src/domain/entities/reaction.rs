//! Message Reaction entity.
//!
//! Maps to the `message_reactions` table in the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// The fixed reaction vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 6] = [
        ReactionKind::Like,
        ReactionKind::Love,
        ReactionKind::Haha,
        ReactionKind::Wow,
        ReactionKind::Sad,
        ReactionKind::Angry,
    ];

    /// Parse a client-supplied value. Unknown values are an `InvalidReaction`.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| AppError::InvalidReaction(format!("Unknown reaction '{}'", value)))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Love => "love",
            Self::Haha => "haha",
            Self::Wow => "wow",
            Self::Sad => "sad",
            Self::Angry => "angry",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Like => "👍",
            Self::Love => "❤️",
            Self::Haha => "😂",
            Self::Wow => "😮",
            Self::Sad => "😢",
            Self::Angry => "😠",
        }
    }
}

/// Represents a reaction on a message.
///
/// Maps to the `message_reactions` table:
/// - message_id: BIGINT NOT NULL REFERENCES messages(id) (composite PK)
/// - user_id: BIGINT NOT NULL REFERENCES users(id) (composite PK)
/// - reaction: VARCHAR(10) NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// The composite primary key (message_id, user_id) ensures
/// at most one reaction per user per message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub message_id: i64,
    pub user_id: i64,
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
}

impl Reaction {
    pub fn new(message_id: i64, user_id: i64, kind: ReactionKind) -> Self {
        Self {
            message_id,
            user_id,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// Result of applying a reaction value for a (message, user) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// No previous reaction; a new row was created
    Added(Reaction),
    /// A different value replaced the previous one
    Changed {
        reaction: Reaction,
        previous: ReactionKind,
    },
    /// The same value was applied again and the row was deleted
    Removed { previous: ReactionKind },
}

impl ReactionOutcome {
    /// Resolve the toggle rule against the user's current reaction, if any.
    pub fn resolve(
        message_id: i64,
        user_id: i64,
        existing: Option<ReactionKind>,
        requested: ReactionKind,
    ) -> Self {
        match existing {
            Some(previous) if previous == requested => Self::Removed { previous },
            Some(previous) => Self::Changed {
                reaction: Reaction::new(message_id, user_id, requested),
                previous,
            },
            None => Self::Added(Reaction::new(message_id, user_id, requested)),
        }
    }

    /// The reaction that persists after the operation.
    pub fn current(&self) -> Option<&Reaction> {
        match self {
            Self::Added(reaction) | Self::Changed { reaction, .. } => Some(reaction),
            Self::Removed { .. } => None,
        }
    }
}
