//! Application Startup
//!
//! Wires storage, the optional Redis mirror, the gateway and the router.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::GroupMirror;
use crate::config::Settings;
use crate::domain::StorageGateway;
use crate::infrastructure::cache::{self, RedisGroupMirror};
use crate::infrastructure::database;
use crate::infrastructure::repositories::PgStorage;
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{Gateway, GroupRegistry, NotificationOptions};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageGateway>,
    pub gateway: Arc<Gateway>,
    pub settings: Arc<Settings>,
    /// Present when backed by Postgres
    pub db: Option<PgPool>,
    /// Present when the Redis mirror is enabled
    pub redis: Option<ConnectionManager>,
}

impl AppState {
    /// State over an arbitrary storage gateway, without Postgres or Redis.
    pub fn with_storage(storage: Arc<dyn StorageGateway>, settings: Settings) -> Self {
        let gateway = Arc::new(Gateway::new(
            Arc::clone(&storage),
            Arc::new(GroupRegistry::default()),
            NotificationOptions::from(&settings.websocket),
        ));
        Self {
            storage,
            gateway,
            settings: Arc::new(settings),
            db: None,
            redis: None,
        }
    }
}

/// Router with tracing and CORS applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
        }

        let snowflake = Arc::new(SnowflakeGenerator::new(settings.snowflake.machine_id as u64));
        let storage: Arc<dyn StorageGateway> = Arc::new(PgStorage::new(db.clone(), snowflake));

        let (redis, mirror) = match &settings.redis.url {
            Some(url) => {
                let conn = cache::create_redis_client(url).await?;
                let (mirror, _publisher) =
                    RedisGroupMirror::spawn(conn.clone(), settings.redis.channel_prefix.clone());
                tracing::info!(prefix = %settings.redis.channel_prefix, "Redis mirror enabled");
                (Some(conn), Some(Arc::new(mirror) as Arc<dyn GroupMirror>))
            }
            None => {
                tracing::info!("Redis mirror disabled");
                (None, None)
            }
        };

        let gateway = Arc::new(Gateway::new(
            Arc::clone(&storage),
            Arc::new(GroupRegistry::new(mirror)),
            NotificationOptions::from(&settings.websocket),
        ));

        let addr: SocketAddr = settings.server_addr().parse()?;
        let state = AppState {
            storage,
            gateway,
            settings: Arc::new(settings),
            db: Some(db),
            redis,
        };
        let router = build_router(state);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until ctrl-c
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
