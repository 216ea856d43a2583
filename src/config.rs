use std::num::NonZeroU32;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub use config::ConfigError;

use crate::mail::MailerConfig;
use crate::rate_limit::AddressRateLimiter;

pub trait EnvConfig: Sized {
    fn from_env() -> Result<Self, ConfigError>;
    fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError>;
}

impl<D> EnvConfig for D
where
    D: DeserializeOwned,
{
    fn from_env() -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix))
            .build()?
            .try_deserialize()
    }
}

/// Whether `/sendEmail` answers before or after the SMTP exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Respond 202 immediately and deliver in the background.
    #[default]
    Async,
    /// Hold the response until the transport reports success or failure.
    Sync,
}

/// Listener-side settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub delivery_mode: DeliveryMode,

    #[serde(default = "default_window_secs")]
    pub rate_limit_window_secs: u64,

    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: u32,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    3000
}

fn default_window_secs() -> u64 {
    60
}

fn default_rate_limit_max() -> u32 {
    60
}

fn default_body_limit() -> usize {
    100 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            delivery_mode: DeliveryMode::default(),
            rate_limit_window_secs: default_window_secs(),
            rate_limit_max: default_rate_limit_max(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl ServerConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Limiter allowing `rate_limit_max` requests per address per window.
    pub fn rate_limiter(&self) -> Result<AddressRateLimiter, ConfigError> {
        let max = NonZeroU32::new(self.rate_limit_max)
            .ok_or_else(|| ConfigError::Message("RATE_LIMIT_MAX must be at least 1".into()))?;
        if self.rate_limit_window_secs == 0 {
            return Err(ConfigError::Message(
                "RATE_LIMIT_WINDOW_SECS must be at least 1".into(),
            ));
        }
        Ok(AddressRateLimiter::new(max, self.rate_limit_window()))
    }

    /// Background delivery has nothing else bounding it, so async mode needs a transport timeout.
    pub fn check_transport(&self, mailer: &MailerConfig) -> Result<(), ConfigError> {
        if self.delivery_mode == DeliveryMode::Async && !mailer.timeouts().is_bounded() {
            return Err(ConfigError::Message(
                "async delivery requires at least one SMTP timeout".into(),
            ));
        }
        Ok(())
    }
}
