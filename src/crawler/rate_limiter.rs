//! Global request throttle shared by every worker.
//!
//! The limiter is a single ticking clock. Each [`RateLimiter::acquire`] call
//! consumes exactly one tick, so the configured rate bounds the aggregate
//! outbound traffic of the whole pool rather than any one worker.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use sumi_harvest::crawler::RateLimiter;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(Duration::from_millis(500));
//! let cancel = CancellationToken::new();
//!
//! // First permit is granted immediately
//! limiter.acquire(&cancel).await.unwrap();
//!
//! // Second permit waits for the next tick
//! limiter.acquire(&cancel).await.unwrap();
//! # }
//! ```

use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Returned when cancellation fires before a permit is granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limiter wait cancelled")]
pub struct AcquireCancelled;

/// Fixed-interval permit source
///
/// Callers serialize on the inner interval: the one holding the lock waits
/// for the next tick while the rest queue behind it in FIFO order.
#[derive(Debug)]
pub struct RateLimiter {
    ticks: Mutex<Interval>,
    period: Duration,
}

impl RateLimiter {
    /// Creates a limiter granting one permit per `period`
    ///
    /// Must be called from within a Tokio runtime. A zero period is raised
    /// to one millisecond.
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut ticks = interval(period);
        // A late tick pushes the schedule back instead of bursting to catch up
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            ticks: Mutex::new(ticks),
            period,
        }
    }

    /// Creates a limiter from a requests-per-second rate
    pub fn per_second(rate: f64) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / rate))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits for the next permit
    ///
    /// Returns `Err(AcquireCancelled)` without consuming a tick if `cancel`
    /// fires first, including when it has already fired on entry.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), AcquireCancelled> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AcquireCancelled),
            _ = self.next_tick() => Ok(()),
        }
    }

    async fn next_tick(&self) {
        let mut ticks = self.ticks.lock().await;
        ticks.tick().await;
    }
}
