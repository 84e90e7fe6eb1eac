//! Storage Gateway Implementations
//!
//! Concrete implementations of the domain [`StorageGateway`](crate::domain::StorageGateway).
//!
//! - **PgStorage** - PostgreSQL, used in production
//! - **InMemoryStorage** - process memory, used by tests and local runs
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chat_hub::infrastructure::repositories::PgStorage;
//! use chat_hub::shared::snowflake::SnowflakeGenerator;
//!
//! let storage = PgStorage::new(pool, Arc::new(SnowflakeGenerator::new(1)));
//! ```

mod memory_storage;
mod pg_storage;

pub use memory_storage::InMemoryStorage;
pub use pg_storage::PgStorage;
