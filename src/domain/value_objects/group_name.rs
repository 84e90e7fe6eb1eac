//! Broadcast group names.
//!
//! Every fanout target is one of three group kinds, rendered on the wire and
//! on the external mirror as `room:<id>`, `user:<id>` or `call:<id>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name of a broadcast group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupName {
    /// Everyone connected to a room
    Room(i64),
    /// Every connection of one user (personal notifications)
    User(i64),
    /// Sessions that joined a room's call
    Call(i64),
}

impl GroupName {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Room(_) => "room",
            Self::User(_) => "user",
            Self::Call(_) => "call",
        }
    }

    pub fn id(&self) -> i64 {
        match *self {
            Self::Room(id) | Self::User(id) | Self::Call(id) => id,
        }
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix(), self.id())
    }
}

/// Error returned when a string is not a valid group name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid group name: {0}")]
pub struct ParseGroupNameError(String);

impl FromStr for GroupName {
    type Err = ParseGroupNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, id) = s
            .split_once(':')
            .ok_or_else(|| ParseGroupNameError(s.to_string()))?;
        let id: i64 = id.parse().map_err(|_| ParseGroupNameError(s.to_string()))?;

        match prefix {
            "room" => Ok(Self::Room(id)),
            "user" => Ok(Self::User(id)),
            "call" => Ok(Self::Call(id)),
            _ => Err(ParseGroupNameError(s.to_string())),
        }
    }
}

impl Serialize for GroupName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GroupName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
