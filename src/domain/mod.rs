//! # Domain Layer
//!
//! Core business types of the chat hub, independent of transport and storage.
//!
//! ## Structure
//!
//! - **entities**: Room, Message, Reaction and the user/presence projections
//! - **value_objects**: Broadcast group names
//! - **services**: Authorization rules for message operations
//! - **storage**: The `StorageGateway` contract implemented by infrastructure

pub mod entities;
pub mod services;
pub mod storage;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use services::*;
pub use storage::StorageGateway;
pub use value_objects::*;

#[cfg(test)]
pub use storage::MockStorageGateway;
