//! Email message type and builder.

use super::MailError;

/// A plain-text email ready to hand to a [`Mailer`](super::Mailer). The sender
/// is always the mailer's configured one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Recipients, one address per entry.
    pub to: Vec<String>,
    pub subject: String,
    /// Plain text body.
    pub text: String,
}

impl Email {
    pub fn builder() -> EmailBuilder {
        EmailBuilder::default()
    }
}

/// Builder for [`Email`].
#[derive(Debug, Default)]
pub struct EmailBuilder {
    to: Vec<String>,
    subject: Option<String>,
    text: Option<String>,
}

impl EmailBuilder {
    /// Add a single recipient.
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Add every address in a comma-joined list such as `"a@x.com, b@y.com"`.
    pub fn to_list(mut self, addresses: &str) -> Self {
        self.to.extend(
            addresses
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from),
        );
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Build the email, validating required fields.
    pub fn build(self) -> Result<Email, MailError> {
        if self.to.is_empty() {
            return Err(MailError::Build("at least one recipient required".into()));
        }

        let subject = self
            .subject
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MailError::Build("subject required".into()))?;

        let text = self
            .text
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MailError::Build("body required".into()))?;

        Ok(Email {
            to: self.to,
            subject,
            text,
        })
    }
}
