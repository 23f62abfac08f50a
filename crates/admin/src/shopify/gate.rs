//! Global admission gate for outbound API calls.
//!
//! Shopify enforces a per-shop rate budget on the server side, so client-side
//! concurrency buys nothing: every REST and GraphQL call shares one gate that
//! admits callers FIFO, keeps at most one call in flight, and spaces call
//! starts by a minimum interval.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// Minimum spacing between the start of any two outbound calls.
pub const DEFAULT_CALL_INTERVAL: Duration = Duration::from_millis(500);

/// FIFO admission gate shared by every call site.
///
/// Constructed explicitly and injected into the client rather than held as a
/// hidden global, so tests can run with a zero interval.
#[derive(Debug)]
pub struct ApiGate {
    interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

/// Proof of admission. The underlying lock is held until the permit is
/// dropped, which keeps the call that owns it the only one in flight.
#[derive(Debug)]
pub struct GatePermit<'a> {
    _guard: MutexGuard<'a, Option<Instant>>,
}

impl ApiGate {
    /// Create a gate with the given minimum spacing between call starts.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Mutex::const_new(None),
        }
    }

    /// Wait for admission.
    ///
    /// Blocks until the previous call has finished (the lock is free) and the
    /// minimum interval since the previous call start has elapsed. Callers
    /// queue on the lock in FIFO order; no priority between call sites.
    pub async fn admit(&self) -> GatePermit<'_> {
        let mut last_start = self.last_start.lock().await;

        if let Some(previous) = *last_start {
            let next_allowed = previous + self.interval;
            let now = Instant::now();
            if next_allowed > now {
                tokio::time::sleep_until(next_allowed).await;
            }
        }

        *last_start = Some(Instant::now());
        GatePermit { _guard: last_start }
    }
}

impl Default for ApiGate {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_INTERVAL)
    }
}
