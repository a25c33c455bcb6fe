//! Scoped token storage.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;

use super::{bounded, bounded_with};
use crate::auth::{self, IssuedToken, Token, TokenScope};
use crate::{Result, UsergateError};

#[derive(sqlx::FromRow)]
struct TokenRow {
    hash: Vec<u8>,
    user_id: i64,
    expiry: i64,
    scope: String,
}

impl TryFrom<TokenRow> for Token {
    type Error = UsergateError;

    fn try_from(row: TokenRow) -> Result<Self> {
        let hash = row
            .hash
            .try_into()
            .map_err(|_| UsergateError::Database("stored token hash is not 32 bytes".to_string()))?;
        let expiry = DateTime::<Utc>::from_timestamp_millis(row.expiry)
            .ok_or_else(|| UsergateError::Database("stored token expiry out of range".to_string()))?;

        Ok(Token {
            hash,
            account_id: row.user_id,
            expiry,
            scope: row.scope.parse()?,
        })
    }
}

/// Repository for token operations.
pub struct TokenRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TokenRepository<'c> {
    /// Create a new repository over a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Mint a token and store its hash.
    ///
    /// Fails with [`UsergateError::Conflict`] on field `token` if the account
    /// already holds a token in `scope`.
    pub async fn create(
        &mut self,
        account_id: i64,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<IssuedToken> {
        let issued = auth::generate(account_id, ttl, scope)?;
        self.insert(&issued.token).await?;
        Ok(issued)
    }

    /// Store an already minted token.
    pub async fn insert(&mut self, token: &Token) -> Result<()> {
        bounded_with(
            sqlx::query("INSERT INTO tokens (hash, user_id, expiry, scope) VALUES (?, ?, ?, ?)")
                .bind(&token.hash[..])
                .bind(token.account_id)
                .bind(token.expiry.timestamp_millis())
                .bind(token.scope.as_str())
                .execute(&mut *self.conn),
            map_insert_error,
        )
        .await?;
        Ok(())
    }

    /// The stored token for (`account_id`, `scope`), expired or not.
    pub async fn get(&mut self, account_id: i64, scope: TokenScope) -> Result<Option<Token>> {
        let row = bounded(
            sqlx::query_as::<_, TokenRow>(
                "SELECT hash, user_id, expiry, scope FROM tokens WHERE user_id = ? AND scope = ?",
            )
            .bind(account_id)
            .bind(scope.as_str())
            .fetch_optional(&mut *self.conn),
        )
        .await?;

        row.map(Token::try_from).transpose()
    }

    /// Remove the token for (`account_id`, `scope`). Returns the number of
    /// rows removed; removing nothing is not an error.
    pub async fn delete(&mut self, account_id: i64, scope: TokenScope) -> Result<u64> {
        let result = bounded(
            sqlx::query("DELETE FROM tokens WHERE user_id = ? AND scope = ?")
                .bind(account_id)
                .bind(scope.as_str())
                .execute(&mut *self.conn),
        )
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete every expired token (maintenance).
    pub async fn purge_expired(&mut self) -> Result<u64> {
        let result = bounded(
            sqlx::query("DELETE FROM tokens WHERE expiry <= ?")
                .bind(Utc::now().timestamp_millis())
                .execute(&mut *self.conn),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

fn map_insert_error(e: sqlx::Error) -> UsergateError {
    match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => UsergateError::Conflict {
            field: "token",
            message: "a token in this scope already exists".to_string(),
        },
        _ => UsergateError::Database(e.to_string()),
    }
}
