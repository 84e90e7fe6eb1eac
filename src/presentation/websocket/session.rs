//! WebSocket Session State

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

pub use crate::application::SessionId;
use crate::application::ServerEvent;
use crate::domain::{GroupName, UserSummary};

/// Lifecycle of one connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// What the connection was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Bound to one room; receives room, personal and call events
    Chat { room_id: i64 },
    /// Personal notification group only
    Notifications,
}

impl SessionKind {
    /// Metrics label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Notifications => "notifications",
        }
    }

    pub fn room_id(&self) -> Option<i64> {
        match self {
            Self::Chat { room_id } => Some(*room_id),
            Self::Notifications => None,
        }
    }
}

/// Cloneable handle the registry uses to reach a session's writer.
#[derive(Debug, Clone)]
pub struct SessionSink {
    pub session_id: SessionId,
    pub user_id: i64,
    sender: mpsc::UnboundedSender<Arc<ServerEvent>>,
}

impl SessionSink {
    /// Queue an event. Returns false once the writer is gone.
    pub fn deliver(&self, event: Arc<ServerEvent>) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Server-side state for one live connection.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub user: UserSummary,
    pub kind: SessionKind,
    state: SessionState,
    active_call: Option<i64>,
    groups: HashSet<GroupName>,
    sink: SessionSink,
}

impl Session {
    /// Create a session in `Connecting` plus the receiving end of its
    /// outbound queue.
    pub fn new(
        user: UserSummary,
        kind: SessionKind,
    ) -> (Self, mpsc::UnboundedReceiver<Arc<ServerEvent>>) {
        let (sender, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let sink = SessionSink {
            session_id: id,
            user_id: user.id,
            sender,
        };
        (
            Self {
                id,
                user,
                kind,
                state: SessionState::Connecting,
                active_call: None,
                groups: HashSet::new(),
                sink,
            },
            rx,
        )
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn active_call(&self) -> Option<i64> {
        self.active_call
    }

    pub fn sink(&self) -> &SessionSink {
        &self.sink
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupName> {
        self.groups.iter()
    }

    /// Send an event to this session only.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sink.deliver(Arc::new(event))
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub(crate) fn set_active_call(&mut self, room_id: Option<i64>) {
        self.active_call = room_id;
    }

    pub(crate) fn track_group(&mut self, group: GroupName) -> bool {
        self.groups.insert(group)
    }

    pub(crate) fn untrack_group(&mut self, group: &GroupName) -> bool {
        self.groups.remove(group)
    }

    pub(crate) fn take_groups(&mut self) -> Vec<GroupName> {
        self.groups.drain().collect()
    }
}
