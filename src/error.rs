use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Request errors surfaced by the relay before any transport call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing fields")]
    MissingFields,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed body: {0}")]
    MalformedBody(JsonRejection),
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // A body that is not declared as JSON is read as an empty object.
            JsonRejection::MissingJsonContentType(_) => Error::MissingFields,
            rejection => Error::MalformedBody(rejection),
        }
    }
}

impl Error {
    pub fn http_code(&self) -> StatusCode {
        match self {
            Error::MalformedBody(rejection @ JsonRejection::BytesRejection(_)) => rejection.status(),
            Error::MissingFields | Error::InvalidRequest(_) | Error::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    pub fn http_message(&self) -> String {
        match self {
            Error::MissingFields => self.to_string(),
            Error::InvalidRequest(message) => message.clone(),
            Error::MalformedBody(rejection) => rejection.body_text(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.http_code(), error = %self, "rejected request");

        let body = Json(jsend::ErrorResponse::new(&self.http_message()));
        (self.http_code(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// JSend error response
///
/// <https://github.com/omniti-labs/jsend>
pub mod jsend {
    #[derive(Debug, serde::Serialize)]
    pub struct ErrorResponse {
        status: &'static str,
        pub message: String,
    }

    impl ErrorResponse {
        pub fn new(message: &str) -> Self {
            ErrorResponse {
                status: "error",
                message: message.into(),
            }
        }
    }
}
