//! Cache Module
//!
//! Redis connection management and the group mirror.
//!
//! # Architecture
//!
//! ```text
//! +-------------------+
//! |  GroupRegistry    |  publish(group, event)
//! +-------------------+
//!          |
//!          v
//! +-------------------+
//! | RedisGroupMirror  |  non-blocking enqueue, ordered per process
//! +-------------------+
//!          |
//!          v
//! +-------------------+
//! | ConnectionManager |  PUBLISH {prefix}{group}
//! +-------------------+
//! ```

mod mirror;

pub use mirror::{run_publisher, MirroredEvent, RedisGroupMirror};

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Arguments
/// * `url` - Redis connection URL
///
/// # Returns
/// * `Ok(ConnectionManager)` - On successful connection
/// * `Err(redis::RedisError)` - If connection fails
#[instrument(skip(url))]
pub async fn create_redis_client(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}
