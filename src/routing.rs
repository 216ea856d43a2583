use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::rate_limit::{limit_by_address, AddressRateLimiter};
use crate::relay::{health, send_email, RelayState};

/// The full HTTP surface. Every route sits behind the per-address limiter.
///
/// Serve with connect info (see [`crate::serve`]); the limiter keys on the
/// remote address.
pub fn api_router(relay: RelayState, limiter: Arc<AddressRateLimiter>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/sendEmail", post(send_email))
        .with_state(relay)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(limiter, limit_by_address))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
