//! Mail templates.
//!
//! Placeholders are written `{{name}}` and filled from [`MailData`]. Every
//! template has a subject, a plain-text body and an HTML body.

use std::collections::BTreeMap;

use crate::{Result, UsergateError};

const ACTIVATION_SUBJECT: &str = "Welcome! Activate your account";

const ACTIVATION_PLAIN: &str = "Hi,

Thanks for signing up. Please send a request to PUT /v1/users/activate with
the following body to activate your account:

{\"token\": \"{{activationToken}}\"}

This token is valid for 3 days and can only be used once.

Thanks,
The usergate team
";

const ACTIVATION_HTML: &str = "<!doctype html>
<html>
<body>
<p>Hi,</p>
<p>Thanks for signing up. Please send a request to <code>PUT /v1/users/activate</code>
with the following body to activate your account:</p>
<pre><code>{\"token\": \"{{activationToken}}\"}</code></pre>
<p>This token is valid for 3 days and can only be used once.</p>
<p>Thanks,<br>The usergate team</p>
</body>
</html>
";

const RESET_SUBJECT: &str = "Reset your password";

const RESET_PLAIN: &str = "Hi,

We received a request to reset the password for {{email}}. Send a request to
PUT /v1/users/password/update with the following body and your new password:

{\"token\": \"{{resetPasswordToken}}\", \"password\": \"<new password>\"}

This token is valid for 1 hour. If you did not ask for a reset, ignore this
message.

Thanks,
The usergate team
";

const RESET_HTML: &str = "<!doctype html>
<html>
<body>
<p>Hi,</p>
<p>We received a request to reset the password for {{email}}. Send a request to
<code>PUT /v1/users/password/update</code> with the following body and your new password:</p>
<pre><code>{\"token\": \"{{resetPasswordToken}}\", \"password\": \"&lt;new password&gt;\"}</code></pre>
<p>This token is valid for 1 hour. If you did not ask for a reset, ignore this message.</p>
<p>Thanks,<br>The usergate team</p>
</body>
</html>
";

/// Which message to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTemplate {
    /// Needs `activationToken`.
    Activation,
    /// Needs `email` and `resetPasswordToken`.
    PasswordReset,
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailData {
    values: BTreeMap<String, String>,
}

/// A template with its placeholders filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub plain: String,
    pub html: String,
}

impl MailData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data for [`MailTemplate::Activation`].
    pub fn activation(token: &str) -> Self {
        Self::new().with("activationToken", token)
    }

    /// Data for [`MailTemplate::PasswordReset`].
    pub fn password_reset(email: &str, token: &str) -> Self {
        Self::new()
            .with("email", email)
            .with("resetPasswordToken", token)
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl MailTemplate {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            MailTemplate::Activation => "activation",
            MailTemplate::PasswordReset => "password_reset",
        }
    }

    fn parts(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            MailTemplate::Activation => (ACTIVATION_SUBJECT, ACTIVATION_PLAIN, ACTIVATION_HTML),
            MailTemplate::PasswordReset => (RESET_SUBJECT, RESET_PLAIN, RESET_HTML),
        }
    }

    /// Fill every placeholder. A placeholder without a value is an error.
    pub fn render(&self, data: &MailData) -> Result<RenderedMail> {
        let (subject, plain, html) = self.parts();
        Ok(RenderedMail {
            subject: fill(subject, data)?,
            plain: fill(plain, data)?,
            html: fill(html, data)?,
        })
    }
}

fn fill(template: &str, data: &MailData) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| UsergateError::Mail("unterminated placeholder".to_string()))?;
        let key = after[..end].trim();
        let value = data
            .get(key)
            .ok_or_else(|| UsergateError::Mail(format!("missing mail data: {key}")))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);

    Ok(out)
}
