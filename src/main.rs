use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::Context as _;
use mail_relay::mail::{MailerConfig, SmtpMailer};
use mail_relay::{Dispatcher, EnvConfig, RelayState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let server = ServerConfig::from_env().context("invalid server configuration")?;
    let mailer_config = MailerConfig::from_env().context("invalid SMTP configuration")?;

    let password = if mailer_config.password.is_some() {
        "PASSWORD_LOADED"
    } else {
        "NO_PASSWORD"
    };
    tracing::info!(
        smtp_user = mailer_config.username.as_deref().unwrap_or(""),
        smtp_pass = password,
        smtp_host = %mailer_config.host,
        smtp_port = mailer_config.port,
        delivery_mode = ?server.delivery_mode,
        "Loaded ENV"
    );
    if mailer_config.accept_invalid_certs {
        tracing::warn!("SMTP certificate validation is disabled");
    }

    server.check_transport(&mailer_config)?;
    let limiter = Arc::new(server.rate_limiter()?);
    limiter.spawn_sweeper();

    let mailer = SmtpMailer::from_config(mailer_config).context("could not build SMTP transport")?;

    let dispatcher = Dispatcher::new();
    let relay = RelayState::new(Arc::new(mailer), server.delivery_mode, dispatcher.clone());

    let routes = mail_relay::api_router(relay, limiter, server.body_limit_bytes);
    mail_relay::serve((Ipv4Addr::UNSPECIFIED, server.port), routes)
        .await
        .context("error running HTTP server")?;

    let abandoned = dispatcher.in_flight();
    if abandoned > 0 {
        tracing::warn!(abandoned, "exiting with background deliveries still in flight");
    }
    Ok(())
}
