//! Throttling middleware.
//!
//! Honors server back-pressure: a 429 or 503 response carrying `Retry-After`
//! (delta-seconds or HTTP-date) or `retry-after-ms` makes this unit wait the
//! dictated time and run the rest of the chain again. Throttled rounds are
//! counted in [`ThrottleState`], apart from the generic retry budget.
//!
//! Responses without a usable hint pass through untouched, leaving them to
//! the retry unit above.

use std::time::{Duration, SystemTime};

use http::HeaderMap;
use http::header::RETRY_AFTER;
use tracing::{debug, warn};

use crate::chain::{Middleware, MiddlewareFuture, Next};
use crate::{Error, RequestContext};

/// Options for [`ThrottleHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleOptions {
    /// Longest server-dictated wait accepted before giving up.
    pub max_wait: Duration,
    /// Throttled rounds allowed per request.
    pub max_rounds: u32,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(60),
            max_rounds: 5,
        }
    }
}

/// Throttled rounds already waited out for the current request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleState {
    rounds: u32,
}

impl ThrottleState {
    /// Number of throttled responses waited out so far.
    #[must_use]
    pub const fn rounds(&self) -> u32 {
        self.rounds
    }
}

/// Middleware waiting out `Retry-After` on throttled responses.
#[derive(Debug, Clone, Default)]
pub struct ThrottleHandler {
    options: ThrottleOptions,
}

impl ThrottleHandler {
    /// Create the unit.
    #[must_use]
    pub const fn new(options: ThrottleOptions) -> Self {
        Self { options }
    }
}

fn is_throttled(status: u16) -> bool {
    status == 429 || status == 503
}

/// Server-dictated wait, read from `retry-after-ms` first, then `Retry-After`
/// as delta-seconds or as an HTTP-date relative to `now`.
///
/// A date in the past yields a zero wait. A wait too large for a
/// [`Duration`] saturates to [`Duration::MAX`], which no `max_wait` accepts.
#[must_use]
pub fn retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    if let Some(millis) = headers
        .get("retry-after-ms")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|millis| !millis.is_nan() && *millis >= 0.0)
    {
        return Some(Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX));
    }

    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = httpdate::parse_http_date(value).ok()?;
    Some(date.duration_since(now).unwrap_or(Duration::ZERO))
}

impl Middleware for ThrottleHandler {
    fn name(&self) -> &'static str {
        "throttle"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext, next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            let max_wait = ctx
                .options()
                .max_throttle_wait
                .unwrap_or(self.options.max_wait);

            loop {
                next.run(ctx).await?;

                let Some(response) = ctx.response() else {
                    return Ok(());
                };
                let status = response.status();
                if !is_throttled(status) {
                    return Ok(());
                }
                let Some(wait) = retry_after(response.headers(), SystemTime::now()) else {
                    return Ok(());
                };

                let rounds = ctx
                    .control()
                    .get::<ThrottleState>()
                    .map_or(0, ThrottleState::rounds)
                    + 1;
                if wait > max_wait || rounds > self.options.max_rounds {
                    warn!(status, ?wait, rounds, url = %ctx.url(), "giving up on throttled request");
                    return Err(Error::RateLimited {
                        status,
                        retry_after: wait,
                        rounds,
                    });
                }

                ctx.control_mut().insert(ThrottleState { rounds });
                debug!(status, ?wait, rounds, url = %ctx.url(), "throttled, waiting");
                ctx.take_response();
                ctx.sleep(wait).await?;
            }
        })
    }
}
