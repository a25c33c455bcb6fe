//! Account lifecycle workflows.
//!
//! Each workflow validates its input, does any slow hashing up front, then
//! applies every storage change in one transaction. Old tokens in a scope
//! are deleted before new ones are minted in that scope. Mail is queued on
//! [`BackgroundTasks`] only after commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use super::password::{hash_password_blocking, verify_password_blocking};
use super::token::{hash_token, validate_token_plaintext, IssuedToken, TokenScope};
use super::validation::{
    validate_email_only, validate_login, validate_password_only, validate_registration,
    validate_update,
};
use super::Identity;
use crate::db::{
    Account, AccountRepository, Database, NewAccount, Permission, PermissionRepository,
    TokenRepository,
};
use crate::mail::{MailData, MailTemplate, Mailer};
use crate::tasks::BackgroundTasks;
use crate::validator::Validator;
use crate::{Result, UsergateError};

const NOT_PERMITTED: &str = "you do not have permission to perform this action";
const NOT_ACTIVATED: &str = "your user account must be activated to access this resource";

/// Input for [`AccountService::register`].
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Input for [`AccountService::login`].
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Input for [`AccountService::update_account`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdateRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A newly created account and the activation token mailed to it.
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: Account,
    pub activation_token: IssuedToken,
}

/// An access/refresh pair.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// An updated account, plus a new activation token if the email changed.
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub account: Account,
    pub activation_token: Option<IssuedToken>,
}

/// Orchestrates registration, activation, login, refresh, logout, password
/// reset and account update.
#[derive(Clone)]
pub struct AccountService {
    db: Database,
    mailer: Arc<dyn Mailer>,
    tasks: BackgroundTasks,
}

impl AccountService {
    pub fn new(db: Database, mailer: Arc<dyn Mailer>, tasks: BackgroundTasks) -> Self {
        Self { db, mailer, tasks }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Create an unactivated account holding `user:read`, and mail it an
    /// activation token.
    pub async fn register(&self, request: RegistrationRequest) -> Result<Registration> {
        validate_registration(&request.username, &request.email, &request.password).finish()?;

        let password_hash = hash_password_blocking(request.password).await?;

        let mut tx = self.db.begin().await?;

        let account = AccountRepository::new(&mut *tx)
            .create(&NewAccount {
                username: request.username,
                email: request.email,
                password_hash,
            })
            .await?;

        PermissionRepository::new(&mut *tx)
            .add(account.id, &[Permission::ReadUser])
            .await?;

        let activation_token = mint(&mut *tx, account.id, TokenScope::Activation).await?;

        tx.commit().await?;

        info!(account_id = account.id, username = %account.username, "account registered");

        self.notify(
            account.email.clone(),
            MailTemplate::Activation,
            MailData::activation(&activation_token.plaintext),
        );

        Ok(Registration {
            account,
            activation_token,
        })
    }

    /// Consume an activation token: mark the account activated and grant
    /// `user:write`. A used or expired token yields [`UsergateError::NotFound`].
    pub async fn activate(&self, token: &str) -> Result<Account> {
        let mut v = Validator::new();
        validate_token_plaintext(&mut v, token);
        v.finish()?;

        let hash = hash_token(token);

        let mut tx = self.db.begin().await?;

        let mut account = AccountRepository::new(&mut *tx)
            .get_by_token(TokenScope::Activation, &hash)
            .await?
            .ok_or(UsergateError::NotFound)?;

        account.activated = true;
        AccountRepository::new(&mut *tx).update(&mut account).await?;

        PermissionRepository::new(&mut *tx)
            .add(account.id, &[Permission::WriteUser])
            .await?;

        TokenRepository::new(&mut *tx)
            .delete(account.id, TokenScope::Activation)
            .await?;

        tx.commit().await?;

        info!(account_id = account.id, "account activated");
        Ok(account)
    }

    /// Check credentials and replace the account's access and refresh tokens.
    ///
    /// Unknown usernames and wrong passwords both yield
    /// [`UsergateError::NotFound`].
    pub async fn login(&self, request: LoginRequest) -> Result<SessionTokens> {
        validate_login(&request.username, &request.password).finish()?;

        let mut conn = self.db.acquire().await?;
        let account = AccountRepository::new(&mut conn)
            .get_by_username(&request.username)
            .await?
            .ok_or(UsergateError::NotFound)?;
        drop(conn);

        let matched = match verify_password_blocking(request.password, account.password_hash.clone())
            .await
        {
            Ok(matched) => matched,
            Err(e) => {
                warn!(account_id = account.id, error = %e, "stored password hash unusable");
                false
            }
        };
        if !matched {
            return Err(UsergateError::NotFound);
        }

        let mut tx = self.db.begin().await?;
        let tokens = rotate_session(&mut *tx, account.id).await?;
        tx.commit().await?;

        info!(account_id = account.id, "login succeeded");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new access/refresh pair. The presented
    /// token stops working; replaying it yields [`UsergateError::NotFound`].
    pub async fn refresh(&self, token: &str) -> Result<SessionTokens> {
        let mut v = Validator::new();
        validate_token_plaintext(&mut v, token);
        v.finish()?;

        let hash = hash_token(token);

        let mut tx = self.db.begin().await?;

        let account = AccountRepository::new(&mut *tx)
            .get_by_token(TokenScope::Refresh, &hash)
            .await?
            .ok_or(UsergateError::NotFound)?;

        let tokens = rotate_session(&mut *tx, account.id).await?;
        tx.commit().await?;

        info!(account_id = account.id, "session refreshed");
        Ok(tokens)
    }

    /// Delete the caller's access and refresh tokens.
    pub async fn logout(&self, identity: &Identity) -> Result<()> {
        let account = identity.account().ok_or(UsergateError::Unauthenticated)?;

        let mut tx = self.db.begin().await?;
        TokenRepository::new(&mut *tx)
            .delete(account.id, TokenScope::Access)
            .await?;
        TokenRepository::new(&mut *tx)
            .delete(account.id, TokenScope::Refresh)
            .await?;
        tx.commit().await?;

        info!(account_id = account.id, "logged out");
        Ok(())
    }

    /// Replace the account's reset token and mail the new one.
    ///
    /// An unknown address yields [`UsergateError::NotFound`].
    pub async fn request_password_reset(&self, email: &str) -> Result<IssuedToken> {
        validate_email_only(email).finish()?;

        let mut conn = self.db.acquire().await?;
        let account = AccountRepository::new(&mut conn)
            .get_by_email(email)
            .await?
            .ok_or(UsergateError::NotFound)?;
        drop(conn);

        let mut tx = self.db.begin().await?;
        TokenRepository::new(&mut *tx)
            .delete(account.id, TokenScope::PasswordReset)
            .await?;
        let reset_token = mint(&mut *tx, account.id, TokenScope::PasswordReset).await?;
        tx.commit().await?;

        info!(account_id = account.id, "password reset requested");

        self.notify(
            account.email.clone(),
            MailTemplate::PasswordReset,
            MailData::password_reset(&account.email, &reset_token.plaintext),
        );

        Ok(reset_token)
    }

    /// Set a new password using a reset token, which is then consumed.
    pub async fn update_password(&self, token: &str, password: &str) -> Result<Account> {
        let mut v = validate_password_only(password);
        validate_token_plaintext(&mut v, token);
        v.finish()?;

        let hash = hash_token(token);

        // Unknown tokens fail before the hashing cost is paid
        let mut conn = self.db.acquire().await?;
        AccountRepository::new(&mut conn)
            .get_by_token(TokenScope::PasswordReset, &hash)
            .await?
            .ok_or(UsergateError::NotFound)?;
        drop(conn);

        let password_hash = hash_password_blocking(password.to_string()).await?;

        // Resolve again under the write lock: the token may have been
        // consumed or replaced while hashing
        let mut tx = self.db.begin().await?;
        let mut account = AccountRepository::new(&mut *tx)
            .get_by_token(TokenScope::PasswordReset, &hash)
            .await?
            .ok_or(UsergateError::NotFound)?;

        account.password_hash = password_hash;
        AccountRepository::new(&mut *tx).update(&mut account).await?;
        TokenRepository::new(&mut *tx)
            .delete(account.id, TokenScope::PasswordReset)
            .await?;
        tx.commit().await?;

        info!(account_id = account.id, "password updated");
        Ok(account)
    }

    /// Change the caller's own email and/or password.
    ///
    /// A new email clears the activation flag and mails a fresh activation
    /// token.
    pub async fn update_account(
        &self,
        identity: &Identity,
        username: &str,
        request: AccountUpdateRequest,
    ) -> Result<AccountUpdate> {
        let caller = self.owner(identity, username)?;

        let mut v = validate_update(request.email.as_deref(), request.password.as_deref());
        v.check(
            request.email.is_some() || request.password.is_some(),
            "account",
            "must provide an email or a password to update",
        );
        v.finish()?;

        let mut account = caller.clone();

        let email_changed = match request.email {
            Some(email) if !email.eq_ignore_ascii_case(&account.email) => {
                account.email = email;
                account.activated = false;
                true
            }
            Some(email) => {
                account.email = email;
                false
            }
            None => false,
        };

        if let Some(password) = request.password {
            account.password_hash = hash_password_blocking(password).await?;
        }

        let mut tx = self.db.begin().await?;

        AccountRepository::new(&mut *tx).update(&mut account).await?;

        let activation_token = if email_changed {
            TokenRepository::new(&mut *tx)
                .delete(account.id, TokenScope::Activation)
                .await?;
            Some(mint(&mut *tx, account.id, TokenScope::Activation).await?)
        } else {
            None
        };

        tx.commit().await?;

        info!(account_id = account.id, email_changed, "account updated");

        if let Some(token) = &activation_token {
            self.notify(
                account.email.clone(),
                MailTemplate::Activation,
                MailData::activation(&token.plaintext),
            );
        }

        Ok(AccountUpdate {
            account,
            activation_token,
        })
    }

    /// The caller's own account, freshly read.
    pub async fn get_account(&self, identity: &Identity, username: &str) -> Result<Account> {
        let caller = self.owner(identity, username)?;

        let mut conn = self.db.acquire().await?;
        let account = AccountRepository::new(&mut conn)
            .get_by_id(caller.id)
            .await?
            .ok_or(UsergateError::Unauthenticated)?;
        Ok(account)
    }

    /// Resolve an access token to its account.
    ///
    /// Malformed, unknown and expired tokens all yield
    /// [`UsergateError::Unauthenticated`].
    pub async fn authenticate(&self, token: &str) -> Result<Account> {
        let mut v = Validator::new();
        validate_token_plaintext(&mut v, token);
        if !v.is_valid() {
            return Err(UsergateError::Unauthenticated);
        }

        let mut conn = self.db.acquire().await?;
        let account = AccountRepository::new(&mut conn)
            .get_by_token(TokenScope::Access, &hash_token(token))
            .await?
            .ok_or(UsergateError::Unauthenticated)?;
        Ok(account)
    }

    /// Require an activated caller holding every one of `required`.
    pub async fn require_permissions<'a>(
        &self,
        identity: &'a Identity,
        required: &[Permission],
    ) -> Result<&'a Account> {
        let account = identity.account().ok_or(UsergateError::Unauthenticated)?;

        if !account.activated {
            return Err(UsergateError::Permission(NOT_ACTIVATED.to_string()));
        }

        let mut conn = self.db.acquire().await?;
        let held = PermissionRepository::new(&mut conn).get(account.id).await?;
        drop(conn);

        if let Some(missing) = required.iter().find(|p| !held.includes(**p)) {
            info!(account_id = account.id, permission = %missing, "permission denied");
            return Err(UsergateError::Permission(NOT_PERMITTED.to_string()));
        }

        Ok(account)
    }

    /// Expiry of the caller's current access token, if it still has one.
    pub async fn session_expiry(&self, identity: &Identity) -> Result<Option<DateTime<Utc>>> {
        let account = identity.account().ok_or(UsergateError::Unauthenticated)?;
        let mut conn = self.db.acquire().await?;
        let token = TokenRepository::new(&mut conn)
            .get(account.id, TokenScope::Access)
            .await?;
        Ok(token.map(|t| t.expiry))
    }

    fn owner<'a>(&self, identity: &'a Identity, username: &str) -> Result<&'a Account> {
        let account = identity.account().ok_or(UsergateError::Unauthenticated)?;
        if account.username != username {
            return Err(UsergateError::Permission(NOT_PERMITTED.to_string()));
        }
        Ok(account)
    }

    fn notify(&self, recipient: String, template: MailTemplate, data: MailData) {
        let mailer = self.mailer.clone();
        self.tasks.spawn("mail", async move {
            mailer.send(&recipient, template, &data).await
        });
    }
}

/// Mint a token, clearing a conflicting one and retrying once.
async fn mint(conn: &mut SqliteConnection, account_id: i64, scope: TokenScope) -> Result<IssuedToken> {
    let mut tokens = TokenRepository::new(conn);
    match tokens.create(account_id, scope.ttl(), scope).await {
        Err(UsergateError::Conflict { field: "token", .. }) => {
            warn!(account_id, scope = %scope, "token already present, replacing");
            tokens.delete(account_id, scope).await?;
            tokens.create(account_id, scope.ttl(), scope).await
        }
        other => other,
    }
}

/// Drop both session tokens, then mint a fresh pair.
async fn rotate_session(conn: &mut SqliteConnection, account_id: i64) -> Result<SessionTokens> {
    TokenRepository::new(&mut *conn)
        .delete(account_id, TokenScope::Refresh)
        .await?;
    TokenRepository::new(&mut *conn)
        .delete(account_id, TokenScope::Access)
        .await?;

    let access = mint(&mut *conn, account_id, TokenScope::Access).await?;
    let refresh = mint(&mut *conn, account_id, TokenScope::Refresh).await?;

    Ok(SessionTokens { access, refresh })
}
