//! Application Layer
//!
//! Wire events, handler logic and presence tracking. This layer turns a
//! decoded client event into storage calls and a fanout description; the
//! presentation layer owns the sockets and the group registry.

pub mod events;
pub mod fanout;
pub mod handlers;
pub mod presence;

pub use events::{ClientEvent, EventKind, ServerEvent};
pub use fanout::{CallMembership, Fanout, GroupMirror, Outcome, SessionId};
pub use presence::{PresenceChange, PresenceTracker, PresenceTransition};
