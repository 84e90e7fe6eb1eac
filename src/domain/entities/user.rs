//! User-facing identity and presence projection.
//!
//! Accounts themselves are owned by the authentication system; the hub only
//! reads the id and display name, and writes the presence columns of
//! `user_profiles`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a connected user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub display_name: String,
}

impl UserSummary {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Entry of a room's online-members snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OnlineParticipant {
    pub user_id: i64,
    pub display_name: String,
}

/// Persisted presence projection.
///
/// Maps to the presence columns of `user_profiles`:
/// - online: BOOLEAN NOT NULL DEFAULT FALSE
/// - last_seen: TIMESTAMPTZ NULL (written on the transition to offline)
/// - last_online: TIMESTAMPTZ NULL (written on the transition to online)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Presence {
    pub user_id: i64,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_online: Option<DateTime<Utc>>,
}

impl Presence {
    /// Apply an online/offline transition at `at`.
    pub fn apply(&mut self, online: bool, at: DateTime<Utc>) {
        self.online = online;
        if online {
            self.last_online = Some(at);
        } else {
            self.last_seen = Some(at);
        }
    }
}
