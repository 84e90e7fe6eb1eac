//! # Chat Hub Library
//!
//! A room-based real-time messaging hub:
//! - WebSocket sessions bound to a room or to a user's notifications
//! - In-process group registry with per-group ordered fanout
//! - Per-event business rules (permissions, idempotence, state transitions)
//! - Presence tracking by connection count
//! - PostgreSQL storage and an optional Redis pub/sub mirror
//!
//! ## Architecture
//!
//! - **Domain Layer**: entities, group names, the storage gateway trait and room policy
//! - **Application Layer**: wire events, event handlers and the presence tracker
//! - **Infrastructure Layer**: storage implementations, Redis mirror, metrics
//! - **Presentation Layer**: WebSocket gateway, group registry, HTTP probes
//!
//! ## Module Structure
//!
//! ```text
//! chat_hub/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, storage trait, policy
//! +-- application/    Events, handlers, presence
//! +-- infrastructure/ Postgres/in-memory storage, Redis mirror, metrics
//! +-- presentation/   WebSocket gateway, HTTP routes, middleware
//! +-- shared/         Errors, validation, snowflake IDs
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Event handling
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
