//! Outbound mail for usergate.
//!
//! Workflows hand a [`MailTemplate`] and its [`MailData`] to a [`Mailer`]
//! after their transaction commits. Two implementations exist:
//! - [`SmtpMailer`] delivers through an SMTP relay.
//! - [`LogMailer`] only logs, for setups without SMTP.

mod smtp;
mod templates;

pub use smtp::SmtpMailer;
pub use templates::{MailData, MailTemplate, RenderedMail};

use async_trait::async_trait;
use tracing::info;

use crate::Result;

/// Delivers templated mail to one recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, template: MailTemplate, data: &MailData) -> Result<()>;
}

/// Mailer that renders and logs instead of delivering.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, template: MailTemplate, data: &MailData) -> Result<()> {
        let rendered = template.render(data)?;
        info!(
            recipient,
            template = template.name(),
            subject = %rendered.subject,
            "SMTP not configured, mail not delivered"
        );
        Ok(())
    }
}
