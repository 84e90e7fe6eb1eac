//! WebSocket Gateway
//!
//! Real-time sessions, the group registry and inbound event routing.

pub mod gateway;
pub mod handler;
pub mod registry;
mod router;
pub mod session;

pub use gateway::{Gateway, NotificationOptions};
pub use handler::{chat_ws_handler, notifications_ws_handler};
pub use registry::GroupRegistry;
pub use session::{Session, SessionId, SessionKind, SessionSink, SessionState};
