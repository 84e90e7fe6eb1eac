//! HTTP surface: health probes, metrics and the WebSocket endpoints.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
