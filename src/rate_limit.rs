//! Per-address request limiting in front of every route.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::jsend;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Requests counted for one address since `started`.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter keyed by remote IP.
///
/// Each address gets its own window, opened by its first request. At most
/// `max` requests pass until the window has run its full length, then the
/// count starts over.
pub struct AddressRateLimiter {
    windows: DashMap<IpAddr, Window>,
    max: NonZeroU32,
    window: Duration,
}

impl AddressRateLimiter {
    pub fn new(max: NonZeroU32, window: Duration) -> Self {
        AddressRateLimiter {
            windows: DashMap::new(),
            max,
            window,
        }
    }

    /// `Err` carries the time left in the address's current window.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let mut entry = self.windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max.get() {
            return Err(self.window - now.duration_since(entry.started));
        }
        entry.count += 1;
        Ok(())
    }

    /// Number of addresses currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Forget addresses whose window has ended.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
    }

    /// Sweep once per window on a background task for the life of the process.
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window);
            interval.tick().await;
            loop {
                interval.tick().await;
                limiter.sweep();
                tracing::trace!(tracked = limiter.tracked(), "rate limiter swept");
            }
        });
    }
}

pub async fn limit_by_address(
    State(limiter): State<Arc<AddressRateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check(addr.ip()) {
        Ok(()) => next.run(request).await,
        Err(wait) => {
            tracing::warn!(remote = %addr.ip(), "rate limit exceeded");
            rejection(wait)
        }
    }
}

fn rejection(wait: Duration) -> Response {
    let secs = (wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(jsend::ErrorResponse::new(RATE_LIMITED_MESSAGE)),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(secs));
    response
}
