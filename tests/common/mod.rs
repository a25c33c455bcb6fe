//! Shared fixtures for usergate integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use usergate::auth::{LoginRequest, RegistrationRequest, SessionTokens};
use usergate::mail::{MailData, MailTemplate, Mailer};
use usergate::{Account, AccountService, BackgroundTasks, Database, Result};

/// Password that satisfies the strength policy.
pub const PASSWORD: &str = "Abcdef1!";

/// A mail captured by [`RecordingMailer`].
#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipient: String,
    pub template: MailTemplate,
    pub data: MailData,
}

/// Mailer that keeps every mail in memory.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// The most recent mail for `recipient`.
    pub fn last_to(&self, recipient: &str) -> Option<SentMail> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.recipient == recipient)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, recipient: &str, template: MailTemplate, data: &MailData) -> Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            template,
            data: data.clone(),
        });
        Ok(())
    }
}

/// A service over a fresh in-memory database.
pub async fn test_service() -> (AccountService, Arc<RecordingMailer>) {
    let db = Database::open_in_memory().await.unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let service = AccountService::new(db, mailer.clone(), BackgroundTasks::new());
    (service, mailer)
}

/// A service over a file-backed database, for tests that need several
/// pooled connections.
pub async fn file_service(dir: &tempfile::TempDir) -> (AccountService, Arc<RecordingMailer>) {
    let path = dir.path().join("usergate.db");
    let db = Database::open(path.to_str().unwrap(), 8).await.unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let service = AccountService::new(db, mailer.clone(), BackgroundTasks::new());
    (service, mailer)
}

pub fn registration(username: &str, email: &str) -> RegistrationRequest {
    RegistrationRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
    }
}

pub fn credentials(username: &str, password: &str) -> LoginRequest {
    LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    }
}

/// Register and activate `username`, returning the activated account.
pub async fn activated_account(service: &AccountService, username: &str) -> Account {
    let registration = service
        .register(registration(username, &format!("{username}@example.com")))
        .await
        .unwrap();
    service
        .activate(&registration.activation_token.plaintext)
        .await
        .unwrap()
}

/// Log `username` in with [`PASSWORD`].
pub async fn login(service: &AccountService, username: &str) -> SessionTokens {
    service.login(credentials(username, PASSWORD)).await.unwrap()
}
