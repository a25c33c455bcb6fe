//! Database module for usergate.
//!
//! This module provides SQLite connectivity through a sqlx pool, migration
//! management, and the repositories for accounts, tokens and permissions.
//!
//! Repositories borrow a `SqliteConnection`, so the same calls work on a
//! pooled connection or inside a caller-owned transaction.

mod account;
mod permission;
mod schema;
mod token;

pub use account::{Account, AccountRepository, NewAccount};
pub use permission::{Permission, PermissionRepository, Permissions};
pub use schema::MIGRATIONS;
pub use token::TokenRepository;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use crate::{Result, UsergateError};

/// Connection pool type.
pub type DbPool = SqlitePool;

/// Upper bound on any single storage call.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Run a storage call under [`QUERY_TIMEOUT`], mapping failures to
/// [`UsergateError::Database`].
pub async fn bounded<T, F>(query: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    bounded_with(query, |e| UsergateError::Database(e.to_string())).await
}

/// Like [`bounded`], with a caller-chosen mapping for query errors.
pub async fn bounded_with<T, F, M>(query: F, map_err: M) -> Result<T>
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
    M: FnOnce(sqlx::Error) -> UsergateError,
{
    match tokio::time::timeout(QUERY_TIMEOUT, query).await {
        Ok(result) => result.map_err(map_err),
        Err(_) => Err(UsergateError::Database("query timed out".to_string())),
    }
}

/// Database wrapper owning the connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database at `url` (`sqlite://path/to/file.db` or a bare path).
    ///
    /// The file and its parent directories are created if missing.
    /// Migrations are applied automatically.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        info!("Opening database at {}", url);

        let options = if url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(url)?
        } else {
            let path = std::path::Path::new(url);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            SqliteConnectOptions::new().filename(path)
        };

        let options = options
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(QUERY_TIMEOUT)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Open an in-memory database for testing.
    ///
    /// Every connection to `:memory:` is a separate database, so the pool is
    /// pinned to one connection that never expires.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Check a connection out of the pool.
    ///
    /// Drop it before calling [`Database::begin`]; an in-memory pool has
    /// only one connection.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        bounded(self.pool.acquire()).await
    }

    /// Begin a new write transaction. Dropping it without commit rolls back.
    ///
    /// The write lock is taken at `BEGIN`, so concurrent writers queue on the
    /// busy timeout and every read inside the transaction sees the latest
    /// committed state.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        bounded(self.pool.begin_with("BEGIN IMMEDIATE")).await
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }

        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;

        Ok(version)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;
        let migrations = MIGRATIONS;

        if current_version as usize >= migrations.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            migrations.len()
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     INTEGER PRIMARY KEY,
                applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in migrations.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;

            sqlx::raw_sql(migration).execute(&mut *tx).await?;

            sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            debug!("Migration v{} applied successfully", version);
        }

        info!(
            "Database migration complete (now at version {})",
            migrations.len()
        );
        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
