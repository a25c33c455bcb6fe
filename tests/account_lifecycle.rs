//! Account lifecycle tests.
//!
//! End-to-end workflows through `AccountService`, checked against the
//! stored rows.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use common::{activated_account, credentials, login, registration, test_service, PASSWORD};
use usergate::auth::{generate, AccountUpdateRequest, TokenScope};
use usergate::db::{AccountRepository, TokenRepository};
use usergate::mail::{MailData, MailTemplate, Mailer};
use usergate::{
    AccountService, BackgroundTasks, Database, Identity, Permission, Result, UsergateError,
};

async fn count(db: &Database, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(db.pool())
        .await
        .unwrap()
}

async fn tokens_in_scope(db: &Database, account_id: i64, scope: TokenScope) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tokens WHERE user_id = ? AND scope = ?")
        .bind(account_id)
        .bind(scope.as_str())
        .fetch_one(db.pool())
        .await
        .unwrap()
}

// ============================================================================
// Registration and activation
// ============================================================================

#[tokio::test]
async fn test_register_activate_and_reactivate() {
    let (service, mailer) = test_service().await;

    let reg = service
        .register(registration("alice", "alice@example.com"))
        .await
        .unwrap();
    assert!(!reg.account.activated);
    assert_eq!(reg.account.version, 1);

    service.tasks().drain().await;
    let mail = mailer.last_to("alice@example.com").unwrap();
    assert_eq!(mail.template, MailTemplate::Activation);
    assert_eq!(
        mail.data.get("activationToken"),
        Some(reg.activation_token.plaintext.as_str())
    );

    let account = service
        .activate(&reg.activation_token.plaintext)
        .await
        .unwrap();
    assert!(account.activated);

    let identity = Identity::from(account.clone());
    service
        .require_permissions(&identity, &[Permission::ReadUser, Permission::WriteUser])
        .await
        .unwrap();

    assert_eq!(
        tokens_in_scope(service.db(), account.id, TokenScope::Activation).await,
        0
    );

    let again = service.activate(&reg.activation_token.plaintext).await;
    assert!(matches!(again, Err(UsergateError::NotFound)));
}

#[tokio::test]
async fn test_duplicate_username_leaves_no_rows() {
    let (service, _mailer) = test_service().await;

    service
        .register(registration("alice", "alice@example.com"))
        .await
        .unwrap();

    let err = service
        .register(registration("alice", "other@example.com"))
        .await
        .unwrap_err();

    match err {
        UsergateError::Conflict { field, message } => {
            assert_eq!(field, "username");
            assert_eq!(message, "a user with this username already exists");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let db = service.db();
    assert_eq!(count(db, "SELECT COUNT(*) FROM users").await, 1);
    assert_eq!(count(db, "SELECT COUNT(*) FROM tokens").await, 1);
    assert_eq!(count(db, "SELECT COUNT(*) FROM user_permissions").await, 1);
}

#[tokio::test]
async fn test_duplicate_email_ignores_case() {
    let (service, _mailer) = test_service().await;

    service
        .register(registration("alice", "alice@example.com"))
        .await
        .unwrap();

    let err = service
        .register(registration("bob", "ALICE@Example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, UsergateError::Conflict { field: "email", .. }));
    assert_eq!(count(service.db(), "SELECT COUNT(*) FROM users").await, 1);
}

#[tokio::test]
async fn test_expired_activation_token() {
    let (service, _mailer) = test_service().await;
    let reg = service
        .register(registration("alice", "alice@example.com"))
        .await
        .unwrap();
    let id = reg.account.id;

    let expired = generate(id, Duration::seconds(-1), TokenScope::Activation).unwrap();
    {
        let mut conn = service.db().acquire().await.unwrap();
        let mut tokens = TokenRepository::new(&mut conn);
        tokens.delete(id, TokenScope::Activation).await.unwrap();
        tokens.insert(&expired.token).await.unwrap();
    }

    let err = service.activate(&expired.plaintext).await.unwrap_err();
    assert!(matches!(err, UsergateError::NotFound));

    // Still stored; expiry is enforced when a token is resolved
    let mut conn = service.db().acquire().await.unwrap();
    let stored = TokenRepository::new(&mut conn)
        .get(id, TokenScope::Activation)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_expired());

    assert_eq!(TokenRepository::new(&mut conn).purge_expired().await.unwrap(), 1);
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_login_rotation_invalidates_old_access_token() {
    let (service, _mailer) = test_service().await;
    let account = activated_account(&service, "alice").await;

    let first = login(&service, "alice").await;
    let second = login(&service, "alice").await;

    assert_ne!(first.access.plaintext, second.access.plaintext);
    assert!(matches!(
        service.authenticate(&first.access.plaintext).await,
        Err(UsergateError::Unauthenticated)
    ));
    assert_eq!(
        service
            .authenticate(&second.access.plaintext)
            .await
            .unwrap()
            .id,
        account.id
    );

    let db = service.db();
    assert_eq!(tokens_in_scope(db, account.id, TokenScope::Access).await, 1);
    assert_eq!(tokens_in_scope(db, account.id, TokenScope::Refresh).await, 1);
}

#[tokio::test]
async fn test_login_does_not_require_activation() {
    let (service, _mailer) = test_service().await;
    service
        .register(registration("alice", "alice@example.com"))
        .await
        .unwrap();

    let tokens = login(&service, "alice").await;
    let account = service.authenticate(&tokens.access.plaintext).await.unwrap();
    assert!(!account.activated);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (service, _mailer) = test_service().await;
    activated_account(&service, "alice").await;

    let err = service
        .login(credentials("alice", "Wrongpw1!"))
        .await
        .unwrap_err();
    assert!(matches!(err, UsergateError::NotFound));

    let err = service.login(credentials("", "")).await.unwrap_err();
    assert!(matches!(err, UsergateError::Validation(_)));
}

#[tokio::test]
async fn test_refresh_rotates_pair_and_rejects_replay() {
    let (service, _mailer) = test_service().await;
    let account = activated_account(&service, "alice").await;
    let session = login(&service, "alice").await;

    let rotated = service.refresh(&session.refresh.plaintext).await.unwrap();
    assert_ne!(rotated.refresh.plaintext, session.refresh.plaintext);
    assert!(rotated.refresh.expiry() > rotated.access.expiry());

    let replay = service.refresh(&session.refresh.plaintext).await;
    assert!(matches!(replay, Err(UsergateError::NotFound)));

    assert!(service.authenticate(&session.access.plaintext).await.is_err());
    service.authenticate(&rotated.access.plaintext).await.unwrap();

    let db = service.db();
    assert_eq!(tokens_in_scope(db, account.id, TokenScope::Access).await, 1);
    assert_eq!(tokens_in_scope(db, account.id, TokenScope::Refresh).await, 1);
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let (service, _mailer) = test_service().await;
    activated_account(&service, "alice").await;
    let session = login(&service, "alice").await;

    let err = service.refresh(&session.access.plaintext).await.unwrap_err();
    assert!(matches!(err, UsergateError::NotFound));
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let (service, _mailer) = test_service().await;
    let account = activated_account(&service, "alice").await;
    login(&service, "alice").await;

    let identity = Identity::from(account.clone());
    service.logout(&identity).await.unwrap();
    service.logout(&identity).await.unwrap();

    let db = service.db();
    assert_eq!(tokens_in_scope(db, account.id, TokenScope::Access).await, 0);
    assert_eq!(tokens_in_scope(db, account.id, TokenScope::Refresh).await, 0);
}

// ============================================================================
// Password reset
// ============================================================================

#[tokio::test]
async fn test_password_reset_flow() {
    let (service, mailer) = test_service().await;
    activated_account(&service, "alice").await;

    let first = service
        .request_password_reset("alice@example.com")
        .await
        .unwrap();
    let reset = service
        .request_password_reset("alice@example.com")
        .await
        .unwrap();

    // Only the newest reset token works
    let err = service
        .update_password(&first.plaintext, "Newpass1!")
        .await
        .unwrap_err();
    assert!(matches!(err, UsergateError::NotFound));

    service.tasks().drain().await;
    let mail = mailer.last_to("alice@example.com").unwrap();
    assert_eq!(mail.template, MailTemplate::PasswordReset);
    assert_eq!(
        mail.data.get("resetPasswordToken"),
        Some(reset.plaintext.as_str())
    );

    let account = service
        .update_password(&reset.plaintext, "Newpass1!")
        .await
        .unwrap();
    assert_eq!(account.version, 3);

    assert!(service.login(credentials("alice", PASSWORD)).await.is_err());
    service
        .login(credentials("alice", "Newpass1!"))
        .await
        .unwrap();

    let reuse = service.update_password(&reset.plaintext, "Another1!").await;
    assert!(matches!(reuse, Err(UsergateError::NotFound)));
}

#[tokio::test]
async fn test_password_reset_unknown_email() {
    let (service, mailer) = test_service().await;

    let err = service
        .request_password_reset("nobody@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, UsergateError::NotFound));

    service.tasks().drain().await;
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_update_password_rejects_weak_password() {
    let (service, _mailer) = test_service().await;
    activated_account(&service, "alice").await;
    let reset = service
        .request_password_reset("alice@example.com")
        .await
        .unwrap();

    let err = service
        .update_password(&reset.plaintext, "weak")
        .await
        .unwrap_err();
    match err {
        UsergateError::Validation(v) => assert!(v.get("password").is_some()),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// Account update
// ============================================================================

#[tokio::test]
async fn test_email_change_requires_reactivation() {
    let (service, mailer) = test_service().await;
    let account = activated_account(&service, "alice").await;
    let identity = Identity::from(account);

    let update = service
        .update_account(
            &identity,
            "alice",
            AccountUpdateRequest {
                email: Some("alice@new.example.com".to_string()),
                password: None,
            },
        )
        .await
        .unwrap();

    assert!(!update.account.activated);
    let token = update.activation_token.unwrap();

    service.tasks().drain().await;
    let mail = mailer.last_to("alice@new.example.com").unwrap();
    assert_eq!(mail.template, MailTemplate::Activation);

    let stale = Identity::from(update.account.clone());
    let err = service
        .require_permissions(&stale, &[Permission::ReadUser])
        .await
        .unwrap_err();
    assert!(matches!(err, UsergateError::Permission(_)));

    let reactivated = service.activate(&token.plaintext).await.unwrap();
    assert!(reactivated.activated);
    assert_eq!(reactivated.email, "alice@new.example.com");
}

#[tokio::test]
async fn test_update_other_account_is_forbidden() {
    let (service, _mailer) = test_service().await;
    let alice = activated_account(&service, "alice").await;
    activated_account(&service, "bob").await;

    let err = service
        .update_account(
            &Identity::from(alice),
            "bob",
            AccountUpdateRequest {
                email: None,
                password: Some("Newpass1!".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UsergateError::Permission(_)));
}

#[tokio::test]
async fn test_update_account_email_taken() {
    let (service, _mailer) = test_service().await;
    let alice = activated_account(&service, "alice").await;
    activated_account(&service, "bob").await;

    let err = service
        .update_account(
            &Identity::from(alice),
            "alice",
            AccountUpdateRequest {
                email: Some("bob@example.com".to_string()),
                password: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UsergateError::Conflict { field: "email", .. }));
}

#[tokio::test]
async fn test_stale_version_update_is_rejected() {
    let (service, _mailer) = test_service().await;
    let account = activated_account(&service, "alice").await;

    let mut conn = service.db().acquire().await.unwrap();
    let mut repo = AccountRepository::new(&mut conn);

    let mut fresh = account.clone();
    fresh.email = "first@example.com".to_string();
    repo.update(&mut fresh).await.unwrap();
    assert_eq!(fresh.version, account.version + 1);

    let mut stale = account.clone();
    stale.email = "second@example.com".to_string();
    let err = repo.update(&mut stale).await.unwrap_err();
    assert!(matches!(err, UsergateError::NotFound));
    assert_eq!(stale.version, account.version);

    let stored = repo.get_by_id(account.id).await.unwrap().unwrap();
    assert_eq!(stored.email, "first@example.com");
    assert_eq!(stored.version, fresh.version);
}

// ============================================================================
// Mail delivery
// ============================================================================

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _: &str, _: MailTemplate, _: &MailData) -> Result<()> {
        Err(UsergateError::Mail("relay unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_mail_failure_does_not_undo_registration() {
    let db = Database::open_in_memory().await.unwrap();
    let service = AccountService::new(db, Arc::new(FailingMailer), BackgroundTasks::new());

    let reg = service
        .register(registration("alice", "alice@example.com"))
        .await
        .unwrap();
    service.tasks().drain().await;

    service
        .activate(&reg.activation_token.plaintext)
        .await
        .unwrap();
}
