//! Request/response logging middleware.
//!
//! Opens a `tracing` span per request and logs the outcome once the rest of
//! the chain returns. Placed first, it sees one entry per `send` call however
//! many attempts the units below make.

use std::time::Instant;

use tracing::{Instrument, Level, debug, info, span, warn};

use crate::RequestContext;
use crate::chain::{Middleware, MiddlewareFuture, Next};

/// Log level for [`LoggingHandler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log request headers too. Sensitive values print as `Sensitive`.
    Debug,
    /// Log a summary line only.
    #[default]
    Info,
}

/// Middleware logging each request with `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler {
    level: LogLevel,
}

impl LoggingHandler {
    /// Create a logging unit at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging unit that logs at debug level.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Middleware for LoggingHandler {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext, next: Next<'a>) -> MiddlewareFuture<'a> {
        let method = ctx.method();
        let url = ctx.url().to_string();
        let span = span!(Level::INFO, "http_request", %method, %url);

        Box::pin(
            async move {
                let start = Instant::now();
                match self.level {
                    LogLevel::Debug => {
                        // HeaderMap's Debug prints sensitive values as `Sensitive`
                        debug!(headers = ?ctx.headers(), "sending request");
                    }
                    LogLevel::Info => info!("sending request"),
                }

                let result = next.run(ctx).await;
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match (&result, ctx.response()) {
                    (Ok(()), Some(response)) if response.is_success() => {
                        info!(status = response.status(), elapsed_ms, "request completed");
                    }
                    (Ok(()), Some(response)) => {
                        warn!(
                            status = response.status(),
                            elapsed_ms,
                            "request completed with HTTP error"
                        );
                    }
                    (Ok(()), None) => warn!(elapsed_ms, "chain produced no response"),
                    (Err(err), _) => warn!(error = %err, elapsed_ms, "request failed"),
                }

                result
            }
            .instrument(span),
        )
    }
}
