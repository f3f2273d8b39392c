//! Database client lifecycle
//!
//! [`Database`] is constructed explicitly and injected into the store. The
//! pool is opened on first use and memoized; concurrent first callers wait
//! on a single connection attempt. After [`Database::close`] every call
//! fails with a connection error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::{error, info, trace, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// Create a PostgreSQL connection pool with custom options.
///
/// # Arguments
///
/// * `database_url` - PostgreSQL connection string
/// * `max_connections` - Maximum number of connections in the pool
/// * `acquire_timeout` - How long a query waits for a free connection
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Lazily connected database client.
#[derive(Debug)]
pub struct Database {
    config: StoreConfig,
    pool: OnceCell<PgPool>,
    closed: AtomicBool,
}

impl Database {
    /// Build a client without connecting.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Build a client and connect immediately.
    pub async fn connect(config: StoreConfig) -> StoreResult<Self> {
        let db = Self::new(config);
        db.pool().await?;
        Ok(db)
    }

    /// Wrap a pool the caller already opened.
    pub fn from_pool(config: StoreConfig, pool: PgPool) -> Self {
        Self {
            config,
            pool: OnceCell::new_with(Some(pool)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get the pool, connecting on first use.
    pub async fn pool(&self) -> StoreResult<&PgPool> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::connection("database client is closed"));
        }

        if let Some(pool) = self.pool.get() {
            trace!("already connected");
            return Ok(pool);
        }

        self.pool.get_or_try_init(|| self.open()).await
    }

    async fn open(&self) -> StoreResult<PgPool> {
        let Some(url) = self.config.database_url.as_deref() else {
            warn!("DATABASE_URL not set, cannot connect");
            return Err(StoreError::connection("DATABASE_URL is not configured"));
        };

        let pool = create_pool(url, self.config.max_connections, self.config.acquire_timeout())
            .await
            .map_err(|e| {
                error!("Database connection failed: {}", e);
                StoreError::Connection {
                    reason: format!("failed to connect: {e}"),
                    source: Some(e),
                }
            })?;

        info!(
            max_connections = self.config.max_connections,
            "Connected to database"
        );
        Ok(pool)
    }

    /// Whether a live pool is held.
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
            && self.pool.get().is_some_and(|pool| !pool.is_closed())
    }

    /// Close the pool. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            info!("Database connection closed");
        }
    }
}
