//! Retry middleware.
//!
//! Retries transient failures with exponential backoff and jitter:
//! - transport failures whose kind is in [`RetryOptions::retry_errors`]
//!   (by default connection errors and timeouts)
//! - responses whose status is in [`RetryOptions::retry_statuses`]
//!   (by default 429, 500, 502, 503, 504)
//!
//! Only idempotent methods are replayed unless
//! [`RetryOptions::retry_non_idempotent`] (or the per-request override) says
//! otherwise. Every retry runs the rest of the chain again from this unit
//! down. When the budget runs out the last failure is wrapped in
//! [`Error::RetryExhausted`].

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::chain::{Middleware, MiddlewareFuture, Next};
use crate::{Error, RequestContext};

/// Transport-level failure kinds the retry unit can replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportFailure {
    /// [`Error::Connection`].
    Connection,
    /// [`Error::Timeout`].
    Timeout,
    /// [`Error::Tls`].
    Tls,
}

impl TransportFailure {
    /// Kind of `error`, if it is a transport failure at all.
    #[must_use]
    pub const fn of(error: &Error) -> Option<Self> {
        match error {
            Error::Connection(_) => Some(Self::Connection),
            Error::Timeout => Some(Self::Timeout),
            Error::Tls(_) => Some(Self::Tls),
            _ => None,
        }
    }
}

/// Options for [`RetryHandler`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
    /// Upper bound for a single backoff delay, before jitter.
    pub max_delay: Duration,
    /// Extra random delay, as a fraction of the computed delay (`0.0..=1.0`).
    pub jitter: f64,
    /// Total time budget; a retry whose delay would overshoot it is not taken.
    pub max_elapsed: Duration,
    /// Response statuses treated as transient.
    pub retry_statuses: Vec<u16>,
    /// Transport failures treated as transient.
    pub retry_errors: Vec<TransportFailure>,
    /// Replay POST and PATCH too.
    pub retry_non_idempotent: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: 0.1,
            max_elapsed: Duration::from_secs(60),
            retry_statuses: vec![429, 500, 502, 503, 504],
            retry_errors: vec![TransportFailure::Connection, TransportFailure::Timeout],
            retry_non_idempotent: false,
        }
    }
}

impl RetryOptions {
    /// Backoff before retry number `retry` (1-based), without jitter.
    #[must_use]
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_factor.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .ok()
            .filter(|delay| *delay < self.max_delay)
            .unwrap_or(self.max_delay)
    }

    /// Backoff before retry number `retry`, with up to `jitter` extra.
    ///
    /// Saturates at [`Duration::MAX`].
    #[must_use]
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        let jitter = if self.jitter.is_nan() {
            0.0
        } else {
            self.jitter.clamp(0.0, 1.0)
        };
        if jitter == 0.0 {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0.0..=jitter);
        let extra = Duration::try_from_secs_f64(base.as_secs_f64() * extra).unwrap_or(Duration::MAX);
        base.saturating_add(extra)
    }
}

/// Attempts made so far for the current request, kept apart from the
/// throttling rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    attempts: u32,
}

impl RetryState {
    /// Attempts made, including the first one.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Retries made after the first attempt.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Middleware retrying transient failures.
#[derive(Debug, Clone, Default)]
pub struct RetryHandler {
    options: RetryOptions,
}

impl RetryHandler {
    /// Create the unit.
    #[must_use]
    pub const fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    /// Returns `true` if the status should be retried.
    fn should_retry_status(&self, status: u16) -> bool {
        self.options.retry_statuses.contains(&status)
    }

    /// Returns `true` if the error should be retried.
    fn should_retry_error(&self, error: &Error) -> bool {
        TransportFailure::of(error).is_some_and(|kind| self.options.retry_errors.contains(&kind))
    }

    fn is_retryable(&self, outcome: &crate::Result<()>, ctx: &RequestContext) -> bool {
        match outcome {
            Ok(()) => ctx
                .response()
                .is_some_and(|response| self.should_retry_status(response.status())),
            Err(error) => self.should_retry_error(error),
        }
    }
}

/// The failure to report once retries are exhausted.
fn last_failure(outcome: crate::Result<()>, ctx: &mut RequestContext) -> Error {
    match (outcome, ctx.take_response()) {
        (Err(error), _) => error,
        (Ok(()), Some(response)) => Error::from_response(&response),
        (Ok(()), None) => Error::invalid_request("retry gave up without a response"),
    }
}

impl Middleware for RetryHandler {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext, next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            let max_retries = ctx.options().max_retries.unwrap_or(self.options.max_retries);
            let replayable = ctx.method().is_idempotent()
                || ctx
                    .options()
                    .retry_non_idempotent
                    .unwrap_or(self.options.retry_non_idempotent);
            let started = Instant::now();
            let mut retries = 0;

            loop {
                let outcome = next.run(ctx).await;
                ctx.control_mut().insert(RetryState {
                    attempts: retries + 1,
                });

                if !self.is_retryable(&outcome, ctx) {
                    return outcome;
                }
                if !replayable {
                    debug!(method = %ctx.method(), "not retrying non-idempotent request");
                    return outcome;
                }

                let delay = self.options.delay(retries + 1);
                let over_budget =
                    started.elapsed().saturating_add(delay) > self.options.max_elapsed;
                if retries >= max_retries || over_budget {
                    let attempts = retries + 1;
                    warn!(attempts, url = %ctx.url(), "retries exhausted");
                    return Err(Error::RetryExhausted {
                        attempts,
                        source: Box::new(last_failure(outcome, ctx)),
                    });
                }

                retries += 1;
                debug!(retry = retries, ?delay, url = %ctx.url(), "retrying request");
                ctx.take_response();
                ctx.sleep(delay).await?;
            }
        })
    }
}
