//! Store facade
//!
//! Owns the database client and the revalidator, and hands out repositories
//! borrowing both. Clones share the same pool.

use std::sync::Arc;

use tracing::info;

use crate::config::StoreConfig;
use crate::db::{migrations, CommunityRepo, Database, ThreadRepo, UserRepo};
use crate::error::StoreResult;
use crate::revalidate::Revalidate;

struct StoreInner {
    db: Database,
    revalidator: Arc<dyn Revalidate>,
}

/// Entry point for page handlers.
///
/// ```no_run
/// use std::sync::Arc;
/// use agora_store::{Store, StoreConfig, TracingRevalidator};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Store::new(StoreConfig::from_env()?, Arc::new(TracingRevalidator));
/// let feed = store.threads().fetch_latest().await?;
/// println!("{} threads", feed.total);
/// store.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("db", &self.inner.db)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Build a store that connects on first use.
    pub fn new(config: StoreConfig, revalidator: Arc<dyn Revalidate>) -> Self {
        Self::with_database(Database::new(config), revalidator)
    }

    /// Build a store around an existing client.
    pub fn with_database(db: Database, revalidator: Arc<dyn Revalidate>) -> Self {
        Self {
            inner: Arc::new(StoreInner { db, revalidator }),
        }
    }

    /// Build a store and connect immediately.
    pub async fn connect(
        config: StoreConfig,
        revalidator: Arc<dyn Revalidate>,
    ) -> StoreResult<Self> {
        let db = Database::connect(config).await?;
        Ok(Self::with_database(db, revalidator))
    }

    pub fn database(&self) -> &Database {
        &self.inner.db
    }

    pub fn config(&self) -> &StoreConfig {
        self.inner.db.config()
    }

    pub fn users(&self) -> UserRepo<'_> {
        UserRepo::new(&self.inner.db, &*self.inner.revalidator)
    }

    pub fn threads(&self) -> ThreadRepo<'_> {
        ThreadRepo::new(&self.inner.db, &*self.inner.revalidator)
    }

    pub fn communities(&self) -> CommunityRepo<'_> {
        CommunityRepo::new(&self.inner.db)
    }

    /// Apply the schema.
    pub async fn migrate(&self) -> StoreResult<()> {
        let pool = self.inner.db.pool().await?;
        migrations::run(pool).await
    }

    /// Run `SELECT 1` against the database.
    pub async fn ping(&self) -> StoreResult<()> {
        let pool = self.inner.db.pool().await?;
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Close the pool. Every clone of this store stops working.
    pub async fn close(&self) {
        self.inner.db.close().await;
        info!("Store closed");
    }
}
