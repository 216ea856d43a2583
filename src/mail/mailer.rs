//! Mailer trait and SMTP implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use uuid::Uuid;

use super::{Email, MailError};

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The `Message-ID` header of the sent message, angle brackets included.
    pub message_id: String,
}

/// Async email sending trait.
///
/// The relay endpoint only sees this trait, so tests can swap in stub transports.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Make one delivery attempt. Failures are not retried.
    async fn send(&self, email: &Email) -> Result<Delivery, MailError>;
}

/// Transport security for the SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Implicit TLS from the first byte (usually port 465).
    Tls,
    /// Plain connection upgraded with STARTTLS, which must succeed.
    Starttls,
    /// No encryption.
    None,
}

/// Configuration for SMTP mailer.
#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    #[serde(rename = "smtp_host")]
    pub host: String,

    #[serde(rename = "smtp_port", default = "default_port")]
    pub port: u16,

    #[serde(rename = "smtp_user")]
    pub username: Option<String>,

    #[serde(rename = "smtp_pass")]
    pub password: Option<String>,

    /// Unset picks [`TlsMode::Tls`] on port 465 and [`TlsMode::Starttls`] elsewhere.
    #[serde(rename = "smtp_tls")]
    pub tls: Option<TlsMode>,

    /// Skip certificate validation for relays with self-signed certificates.
    #[serde(rename = "smtp_tls_accept_invalid_certs", default)]
    pub accept_invalid_certs: bool,

    pub from_name: Option<String>,

    pub from_email: String,

    #[serde(rename = "smtp_connection_timeout_ms", default = "default_timeout_ms")]
    pub connection_timeout_ms: u64,

    #[serde(rename = "smtp_greeting_timeout_ms", default = "default_timeout_ms")]
    pub greeting_timeout_ms: u64,

    #[serde(rename = "smtp_socket_timeout_ms", default = "default_timeout_ms")]
    pub socket_timeout_ms: u64,
}

fn default_port() -> u16 {
    587
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl MailerConfig {
    pub fn tls_mode(&self) -> TlsMode {
        self.tls.unwrap_or(if self.port == 465 {
            TlsMode::Tls
        } else {
            TlsMode::Starttls
        })
    }

    pub fn timeouts(&self) -> SmtpTimeouts {
        SmtpTimeouts {
            connection: millis(self.connection_timeout_ms),
            greeting: millis(self.greeting_timeout_ms),
            socket: millis(self.socket_timeout_ms),
        }
    }

    /// Both halves of the credentials, when both are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.username.as_deref().filter(|u| !u.is_empty())?;
        let pass = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((user, pass))
    }
}

/// Connection, greeting and idle-socket timeouts. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmtpTimeouts {
    pub connection: Option<Duration>,
    pub greeting: Option<Duration>,
    pub socket: Option<Duration>,
}

impl SmtpTimeouts {
    /// lettre applies a single timeout to connecting, reading the greeting and
    /// every later socket operation, so the largest configured value wins.
    pub fn effective(&self) -> Option<Duration> {
        [self.connection, self.greeting, self.socket]
            .into_iter()
            .flatten()
            .max()
    }

    pub fn is_bounded(&self) -> bool {
        self.effective().is_some()
    }
}

/// SMTP-based mailer using lettre.
///
/// Built once at startup and shared read-only; the underlying transport pools
/// connections across concurrent sends.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a mailer from explicit configuration. No connection is opened here.
    pub fn from_config(config: MailerConfig) -> Result<Self, MailError> {
        let from = sender_mailbox(&config)?;

        let tls = match config.tls_mode() {
            TlsMode::None => Tls::None,
            mode => {
                let params = TlsParameters::builder(config.host.clone())
                    .dangerous_accept_invalid_certs(config.accept_invalid_certs)
                    .build()
                    .map_err(|e| MailError::Smtp(e.to_string()))?;
                if mode == TlsMode::Tls {
                    Tls::Wrapper(params)
                } else {
                    Tls::Required(params)
                }
            }
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls)
            .timeout(config.timeouts().effective());

        if let Some((username, password)) = config.credentials() {
            builder = builder.credentials(Credentials::new(username.into(), password.into()));
        }

        Ok(Self {
            transport: Arc::new(builder.build()),
            from,
        })
    }

    /// The sender stamped on every message.
    pub fn sender(&self) -> &Mailbox {
        &self.from
    }

    /// Build a lettre Message and the Message-ID stamped on it.
    fn build_message(&self, email: &Email) -> Result<(Message, String), MailError> {
        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain());

        let mut builder = Message::builder()
            .from(self.from.clone())
            .message_id(Some(message_id.clone()))
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN);

        for to in &email.to {
            builder = builder.to(parse_mailbox(to)?);
        }

        let message = builder
            .body(email.text.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        Ok((message, message_id))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|_| MailError::InvalidAddress(address.to_string()))
}

fn sender_mailbox(config: &MailerConfig) -> Result<Mailbox, MailError> {
    if config.from_email.is_empty() {
        return Err(MailError::MissingConfig("FROM_EMAIL".into()));
    }
    let address: Address = config
        .from_email
        .parse()
        .map_err(|_| MailError::InvalidAddress(config.from_email.clone()))?;
    let name = config.from_name.clone().filter(|n| !n.is_empty());
    Ok(Mailbox::new(name, address))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<Delivery, MailError> {
        let (message, message_id) = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        Ok(Delivery { message_id })
    }
}
