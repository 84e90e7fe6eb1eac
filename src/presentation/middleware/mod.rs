//! Middleware
//!
//! Handshake authentication, CORS and request tracing.

pub mod auth;
pub mod cors;
pub mod logging;

pub use auth::{authenticate, bearer_token, decode_user_id, Claims};
pub use cors::create_cors_layer;
pub use logging::{create_trace_layer, track_metrics};
