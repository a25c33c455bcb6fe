//! Account entity and repository.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::{bounded, bounded_with};
use crate::auth::{TokenHash, TokenScope};
use crate::{Result, UsergateError};

const ACCOUNT_COLUMNS: &str = "id, created_at, username, email, password_hash, activated, version";

/// Account entity.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Account {
    /// Account ID, assigned by storage.
    pub id: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Unique, case-sensitive login name.
    pub username: String,
    /// Unique, case-insensitive email address.
    pub email: String,
    /// Argon2id PHC hash.
    pub password_hash: String,
    /// Whether the email address has been confirmed.
    pub activated: bool,
    /// Optimistic-concurrency counter, bumped on every update.
    pub version: i64,
}

/// New account for creation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Repository for account operations.
pub struct AccountRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AccountRepository<'c> {
    /// Create a new repository over a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert a new, unactivated account at version 1.
    ///
    /// A duplicate username or email yields [`UsergateError::Conflict`].
    pub async fn create(&mut self, new_account: &NewAccount) -> Result<Account> {
        let sql = format!(
            "INSERT INTO users (created_at, username, email, password_hash)
             VALUES (?, ?, ?, ?) RETURNING {ACCOUNT_COLUMNS}"
        );
        let account = bounded_with(
            sqlx::query_as::<_, Account>(&sql)
                .bind(Utc::now())
                .bind(&new_account.username)
                .bind(&new_account.email)
                .bind(&new_account.password_hash)
                .fetch_one(&mut *self.conn),
            map_write_error,
        )
        .await?;

        Ok(account)
    }

    /// Get an account by ID.
    pub async fn get_by_id(&mut self, id: i64) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?");
        bounded(
            sqlx::query_as::<_, Account>(&sql)
                .bind(id)
                .fetch_optional(&mut *self.conn),
        )
        .await
    }

    /// Get an account by username (case-sensitive).
    pub async fn get_by_username(&mut self, username: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = ?");
        bounded(
            sqlx::query_as::<_, Account>(&sql)
                .bind(username)
                .fetch_optional(&mut *self.conn),
        )
        .await
    }

    /// Get an account by email (case-insensitive).
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = ?");
        bounded(
            sqlx::query_as::<_, Account>(&sql)
                .bind(email)
                .fetch_optional(&mut *self.conn),
        )
        .await
    }

    /// Resolve the owner of an unexpired token in `scope`.
    ///
    /// Expired, unknown and wrong-scope tokens all yield `None`.
    pub async fn get_by_token(
        &mut self,
        scope: TokenScope,
        hash: &TokenHash,
    ) -> Result<Option<Account>> {
        let account = bounded(
            sqlx::query_as::<_, Account>(
                "SELECT u.id, u.created_at, u.username, u.email, u.password_hash, u.activated, u.version
                 FROM users u
                 INNER JOIN tokens t ON t.user_id = u.id
                 WHERE t.hash = ? AND t.scope = ? AND t.expiry > ?",
            )
            .bind(&hash[..])
            .bind(scope.as_str())
            .bind(Utc::now().timestamp_millis())
            .fetch_optional(&mut *self.conn),
        )
        .await?;

        Ok(account)
    }

    /// Write `account` back if nobody else has updated it since it was read.
    ///
    /// On success `account.version` is advanced. A stale version yields
    /// [`UsergateError::NotFound`] and leaves the row untouched.
    pub async fn update(&mut self, account: &mut Account) -> Result<()> {
        let version: Option<i64> = bounded_with(
            sqlx::query_scalar(
                "UPDATE users
                 SET username = ?, email = ?, password_hash = ?, activated = ?, version = version + 1
                 WHERE id = ? AND version = ?
                 RETURNING version",
            )
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.activated)
            .bind(account.id)
            .bind(account.version)
            .fetch_optional(&mut *self.conn),
            map_write_error,
        )
        .await?;

        match version {
            Some(version) => {
                account.version = version;
                Ok(())
            }
            None => Err(UsergateError::NotFound),
        }
    }
}

/// Distinguish username and email uniqueness violations from other failures.
fn map_write_error(e: sqlx::Error) -> UsergateError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("users.username") {
                return UsergateError::Conflict {
                    field: "username",
                    message: "a user with this username already exists".to_string(),
                };
            }
            if message.contains("users.email") {
                return UsergateError::Conflict {
                    field: "email",
                    message: "a user with this email address already exists".to_string(),
                };
            }
        }
    }
    UsergateError::Database(e.to_string())
}
