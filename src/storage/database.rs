use anyhow::{Context, Result};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

use crate::application::AppError;

use super::{MIGRATION_001_TENANCY, MIGRATION_002_LEDGERS, MIGRATION_003_ASSESSMENTS};

/// Future returned by a transaction body; borrows the connection for `'c`.
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'c>>;

/// Handle to the SQLite database shared by every service.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Every statement is idempotent.
    pub async fn migrate(&self) -> Result<()> {
        for (name, sql) in [
            ("001", MIGRATION_001_TENANCY),
            ("002", MIGRATION_002_LEDGERS),
            ("003", MIGRATION_003_ASSESSMENTS),
        ] {
            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to run migration {}", name))?;
            debug!(migration = name, "migration applied");
        }
        Ok(())
    }

    /// Open (creating if needed) and migrate the database file at `path`.
    pub async fn init(path: &str) -> Result<Self> {
        let db = Self::connect(&format!("sqlite:{}?mode=rwc", path)).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// A pooled connection for read-only work outside a transaction.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .context("Failed to acquire connection")
    }

    /// Run `body` inside a transaction: commit when it returns `Ok`, roll back and
    /// return the error unchanged otherwise.
    pub async fn transaction<T, F>(&self, body: F) -> Result<T, AppError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> TxFuture<'c, T> + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        match body(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.context("Failed to commit transaction")?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                warn!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}
