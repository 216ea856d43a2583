#![allow(dead_code)]

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, Response};
use axum::Router;
use mail_relay::mail::{Delivery, Email, MailError, Mailer};
use mail_relay::{api_router, AddressRateLimiter, DeliveryMode, Dispatcher, RelayState};
use serde_json::Value;

pub enum Behavior {
    Succeed(&'static str),
    Fail(&'static str),
    /// Fail the first call, succeed on every later one.
    FailOnce,
    /// Sleep, then succeed.
    Delay(Duration),
}

/// Counts every `send` and answers according to its [`Behavior`].
pub struct StubMailer {
    calls: AtomicUsize,
    behavior: Behavior,
}

impl StubMailer {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(StubMailer {
            calls: AtomicUsize::new(0),
            behavior,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Poll until `n` calls have been made or a second has passed.
    pub async fn wait_for_calls(&self, n: usize) -> usize {
        let _ = tokio::time::timeout(Duration::from_secs(1), async {
            while self.calls() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        self.calls()
    }
}

#[async_trait]
impl Mailer for StubMailer {
    async fn send(&self, _email: &Email) -> Result<Delivery, MailError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(id) => Ok(Delivery {
                message_id: id.to_string(),
            }),
            Behavior::Fail(error) => Err(MailError::Smtp(error.to_string())),
            Behavior::FailOnce if call == 0 => Err(MailError::Smtp("greeting timeout".into())),
            Behavior::FailOnce => Ok(Delivery {
                message_id: format!("<retry-{call}@test>"),
            }),
            Behavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Delivery {
                    message_id: "<slow@test>".into(),
                })
            }
        }
    }
}

pub fn limiter(max: u32, window: Duration) -> Arc<AddressRateLimiter> {
    Arc::new(AddressRateLimiter::new(NonZeroU32::new(max).unwrap(), window))
}

pub fn app(stub: &Arc<StubMailer>, mode: DeliveryMode) -> Router {
    app_with_limiter(stub, mode, limiter(1_000, Duration::from_secs(60)))
}

pub fn app_with_limiter(
    stub: &Arc<StubMailer>,
    mode: DeliveryMode,
    limiter: Arc<AddressRateLimiter>,
) -> Router {
    let mailer: Arc<dyn Mailer> = stub.clone();
    let relay = RelayState::new(mailer, mode, Dispatcher::new());
    api_router(relay, limiter, 100 * 1024)
}

pub fn client() -> SocketAddr {
    "203.0.113.7:40000".parse().unwrap()
}

pub fn post_raw(from: SocketAddr, body: impl Into<Body>) -> Request<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/sendEmail")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(from));
    request
}

pub fn post_json(from: SocketAddr, body: Value) -> Request<Body> {
    post_raw(from, body.to_string())
}

pub fn get(from: SocketAddr, uri: &str) -> Request<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    request.extensions_mut().insert(ConnectInfo(from));
    request
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
