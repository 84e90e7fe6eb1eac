//! Fanout descriptions
//!
//! Handlers never publish directly. They return an [`Outcome`] describing what
//! to deliver once their mutation has committed, and the gateway publishes it.
//! A handler that fails or is aborted therefore never leaks a partial fanout.

use uuid::Uuid;

use crate::application::events::ServerEvent;
use crate::domain::GroupName;

/// Identifies one live connection.
pub type SessionId = Uuid;

/// One event bound for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct Fanout {
    pub group: GroupName,
    pub event: ServerEvent,
    /// Skip this one session. Other sessions of the same user still receive
    /// the event, so a user's second tab in a call sees relayed signaling.
    pub exclude_session: Option<SessionId>,
}

impl Fanout {
    pub fn to(group: GroupName, event: ServerEvent) -> Self {
        Self {
            group,
            event,
            exclude_session: None,
        }
    }

    pub fn excluding(group: GroupName, event: ServerEvent, session_id: SessionId) -> Self {
        Self {
            group,
            event,
            exclude_session: Some(session_id),
        }
    }
}

/// Change to the calling session's call membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMembership {
    Join(i64),
    Leave(i64),
}

/// What a handler wants done after it succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub fanout: Vec<Fanout>,
    pub call: Option<CallMembership>,
}

impl Outcome {
    /// Nothing to publish (idempotent repeat, ignored target).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(fanout: Fanout) -> Self {
        Self {
            fanout: vec![fanout],
            call: None,
        }
    }

    pub fn with_call(mut self, call: CallMembership) -> Self {
        self.call = Some(call);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fanout.is_empty() && self.call.is_none()
    }
}

/// Integration point that copies every published event to an external bus.
///
/// Implementations must not block: `mirror` is called while the group's
/// delivery lock is held so mirrored events keep the local publish order.
pub trait GroupMirror: Send + Sync {
    fn mirror(&self, group: &GroupName, event: &ServerEvent);
}
