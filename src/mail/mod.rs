//! Outbound email over SMTP.
//!
//! A thin layer over [lettre](https://lettre.rs): an [`Email`] value built from
//! the relay request, a [`Mailer`] trait the endpoint depends on, and the
//! [`SmtpMailer`] implementation configured once from the environment.
//!
//! # Environment Variables
//!
//! [`MailerConfig`] reads:
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `SMTP_HOST` | Yes | SMTP server hostname |
//! | `SMTP_PORT` | No | Port (default: 587) |
//! | `SMTP_USER` | No | Username for authentication |
//! | `SMTP_PASS` | No | Password for authentication |
//! | `SMTP_TLS` | No | `tls`, `starttls` or `none` (default: `tls` on port 465, else `starttls`) |
//! | `SMTP_TLS_ACCEPT_INVALID_CERTS` | No | Skip certificate validation (default: false) |
//! | `FROM_NAME` | No | Sender display name |
//! | `FROM_EMAIL` | Yes | Sender address |
//! | `SMTP_CONNECTION_TIMEOUT_MS` | No | Default 10000, 0 disables |
//! | `SMTP_GREETING_TIMEOUT_MS` | No | Default 10000, 0 disables |
//! | `SMTP_SOCKET_TIMEOUT_MS` | No | Default 10000, 0 disables |

mod mailer;
mod message;

pub use mailer::{Delivery, Mailer, MailerConfig, SmtpMailer, SmtpTimeouts, TlsMode};
pub use message::{Email, EmailBuilder};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("missing required config: {0}")]
    MissingConfig(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}
