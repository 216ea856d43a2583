//! Relay JSON email requests to an upstream SMTP server.
//!
//! `POST /sendEmail` takes `{to, subject, body}` and makes exactly one send
//! attempt through a [`mail::Mailer`]. In [`DeliveryMode::Sync`] the caller
//! gets the transport's answer; in [`DeliveryMode::Async`] it gets `202` and the
//! outcome only reaches the logs.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod mail;
pub mod rate_limit;
pub mod relay;
pub mod routing;
mod serve;

pub use config::{DeliveryMode, EnvConfig, ServerConfig};
pub use dispatch::Dispatcher;
pub use rate_limit::AddressRateLimiter;
pub use relay::{RelayState, SendOutcome, SendRequest};
pub use routing::api_router;
pub use serve::{serve, shutdown_signal};
