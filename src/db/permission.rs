//! Per-account capability grants.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use sqlx::SqliteConnection;
use tracing::warn;

use super::bounded;
use crate::{Result, UsergateError};

/// A named capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// `user:read`, granted at registration.
    ReadUser,
    /// `user:write`, granted at activation.
    WriteUser,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadUser => "user:read",
            Permission::WriteUser => "user:write",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = UsergateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user:read" => Ok(Permission::ReadUser),
            "user:write" => Ok(Permission::WriteUser),
            other => Err(UsergateError::Database(format!(
                "unknown permission: {other}"
            ))),
        }
    }
}

/// The capabilities held by one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(HashSet<Permission>);

impl Permissions {
    pub fn includes(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Permissions(iter.into_iter().collect())
    }
}

/// Repository for permission grants.
pub struct PermissionRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> PermissionRepository<'c> {
    /// Create a new repository over a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Grant `permissions` to `account_id`. Already-held grants are kept.
    pub async fn add(&mut self, account_id: i64, permissions: &[Permission]) -> Result<()> {
        for permission in permissions {
            bounded(
                sqlx::query(
                    "INSERT OR IGNORE INTO user_permissions (user_id, permission_id)
                     SELECT ?, id FROM permissions WHERE code = ?",
                )
                .bind(account_id)
                .bind(permission.as_str())
                .execute(&mut *self.conn),
            )
            .await?;
        }
        Ok(())
    }

    /// All capabilities held by `account_id`.
    pub async fn get(&mut self, account_id: i64) -> Result<Permissions> {
        let codes: Vec<String> = bounded(
            sqlx::query_scalar(
                "SELECT p.code FROM permissions p
                 INNER JOIN user_permissions up ON up.permission_id = p.id
                 WHERE up.user_id = ?",
            )
            .bind(account_id)
            .fetch_all(&mut *self.conn),
        )
        .await?;

        Ok(codes
            .iter()
            .filter_map(|code| match code.parse() {
                Ok(permission) => Some(permission),
                Err(_) => {
                    warn!(account_id, code = %code, "Ignoring unknown permission code");
                    None
                }
            })
            .collect())
    }
}
