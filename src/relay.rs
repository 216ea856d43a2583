//! The `/sendEmail` endpoint: one validated request, one send attempt.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config::DeliveryMode;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::mail::{Delivery, Email, MailError, Mailer};

pub const QUEUED_MESSAGE: &str = "Email queued for delivery";

/// Inbound body. Every field is optional on the wire so absence and emptiness
/// are reported the same way.
#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

impl SendRequest {
    pub fn into_email(self) -> Result<Email> {
        let (Some(to), Some(subject), Some(body)) =
            (present(self.to), present(self.subject), present(self.body))
        else {
            return Err(Error::MissingFields);
        };

        Email::builder()
            .to_list(&to)
            .subject(subject)
            .text(body)
            .build()
            .map_err(|e| Error::InvalidRequest(e.to_string()))
    }
}

/// What the caller is told about its email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SendOutcome {
    Queued {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Sent {
        message_id: String,
    },
    Failed {
        error: String,
    },
}

impl SendOutcome {
    pub fn queued() -> Self {
        SendOutcome::Queued {
            message: QUEUED_MESSAGE.to_string(),
        }
    }

    pub fn http_code(&self) -> StatusCode {
        match self {
            SendOutcome::Queued { .. } => StatusCode::ACCEPTED,
            SendOutcome::Sent { .. } => StatusCode::OK,
            SendOutcome::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::result::Result<Delivery, MailError>> for SendOutcome {
    fn from(result: std::result::Result<Delivery, MailError>) -> Self {
        match result {
            Ok(delivery) => SendOutcome::Sent {
                message_id: delivery.message_id,
            },
            Err(e) => SendOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}

impl IntoResponse for SendOutcome {
    fn into_response(self) -> Response {
        (self.http_code(), Json(self)).into_response()
    }
}

/// The one log line each send attempt produces.
pub(crate) fn log_delivery(result: &std::result::Result<Delivery, MailError>) {
    match result {
        Ok(delivery) => tracing::info!(message_id = %delivery.message_id, "Email sent"),
        Err(e) => tracing::error!(error = %e, "Email send failed"),
    }
}

/// Shared, read-only endpoint state.
#[derive(Clone)]
pub struct RelayState {
    mailer: Arc<dyn Mailer>,
    mode: DeliveryMode,
    dispatcher: Dispatcher,
}

impl RelayState {
    pub fn new(mailer: Arc<dyn Mailer>, mode: DeliveryMode, dispatcher: Dispatcher) -> Self {
        RelayState {
            mailer,
            mode,
            dispatcher,
        }
    }

    pub async fn relay(&self, email: Email) -> SendOutcome {
        match self.mode {
            DeliveryMode::Sync => {
                let result = self.mailer.send(&email).await;
                log_delivery(&result);
                result.into()
            }
            DeliveryMode::Async => {
                self.dispatcher.submit(self.mailer.clone(), email);
                SendOutcome::queued()
            }
        }
    }
}

pub async fn send_email(
    State(relay): State<RelayState>,
    payload: std::result::Result<Json<SendRequest>, JsonRejection>,
) -> Result<SendOutcome> {
    let Json(request) = payload?;
    let email = request.into_email()?;

    Ok(relay.relay(email).await)
}

pub async fn health() -> &'static str {
    "Email API Running"
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(to: Option<&str>, subject: Option<&str>, body: Option<&str>) -> SendRequest {
        SendRequest {
            to: to.map(String::from),
            subject: subject.map(String::from),
            body: body.map(String::from),
        }
    }

    #[test]
    fn every_missing_subset_is_rejected() {
        let values = [None, Some(""), Some("x@example.com")];
        for to in values {
            for subject in values {
                for body in values {
                    let complete = [to, subject, body]
                        .iter()
                        .all(|v| matches!(v, Some(s) if !s.is_empty()));
                    let result = request(to, subject, body).into_email();
                    if complete {
                        assert!(result.is_ok());
                    } else {
                        assert!(matches!(result, Err(Error::MissingFields)));
                    }
                }
            }
        }
    }

    #[test]
    fn recipient_list_without_addresses_is_invalid() {
        let result = request(Some(" , "), Some("Hi"), Some("Hello")).into_email();
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn outcome_wire_format() {
        let sent = SendOutcome::Sent {
            message_id: "abc123".into(),
        };
        assert_eq!(
            serde_json::to_value(&sent).unwrap(),
            json!({"status": "sent", "messageId": "abc123"})
        );

        assert_eq!(
            serde_json::to_value(SendOutcome::queued()).unwrap(),
            json!({"status": "queued", "message": "Email queued for delivery"})
        );

        let failed: SendOutcome = Err(MailError::Smtp("connection refused".into())).into();
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"status": "failed", "error": "SMTP error: connection refused"})
        );
    }

    #[test]
    fn outcome_status_codes() {
        assert_eq!(SendOutcome::queued().http_code(), StatusCode::ACCEPTED);
        assert_eq!(
            SendOutcome::Sent { message_id: "x".into() }.http_code(),
            StatusCode::OK
        );
        assert_eq!(
            SendOutcome::Failed { error: "x".into() }.http_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
