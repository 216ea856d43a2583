//! Fire-and-forget delivery for async mode.
//!
//! Submitted sends run on detached tokio tasks whose handles are dropped: there
//! is no retry, no cancellation and no completion signal back to the caller.
//! A send still running when the process exits is lost. The in-flight gauge
//! exists so shutdown can say how many.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::Instrument;

use crate::mail::{Email, Mailer};
use crate::relay::log_delivery;

#[derive(Clone, Default)]
pub struct Dispatcher {
    in_flight: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn one delivery attempt and return immediately.
    pub fn submit(&self, mailer: Arc<dyn Mailer>, email: Email) {
        let guard = InFlight::enter(self.in_flight.clone());
        let span = tracing::info_span!("delivery", to = %email.to.join(", "));

        tokio::spawn(
            async move {
                let _guard = guard;
                let result = mailer.send(&email).await;
                log_delivery(&result);
            }
            .instrument(span),
        );
    }

    /// Number of submitted sends that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Decrements the gauge when the task finishes, panics included.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        InFlight(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
