//! Built-in middleware units.
//!
//! Each unit handles one concern and implements [`Middleware`]:
//!
//! - [`AuthenticationHandler`] - attaches `Authorization: Bearer <token>`
//! - [`RedirectHandler`] - follows 3xx responses
//! - [`RetryHandler`] - retries transient failures with backoff
//! - [`ThrottleHandler`] - waits out `Retry-After` on 429/503
//! - [`LoggingHandler`] - logs requests with `tracing`
//!
//! Units run in the order they are added to a [`ChainBuilder`]: the first one
//! added sees the request first and the response last.
//!
//! # Example
//!
//! ```ignore
//! use graft::Chain;
//! use graft::middleware::{RedirectHandler, RetryHandler, ThrottleHandler};
//!
//! let chain = Chain::builder()
//!     .with(RedirectHandler::default())
//!     .with(RetryHandler::default())
//!     .with(ThrottleHandler::default())
//!     .terminate(transport);
//! ```
//!
//! [`Middleware`]: crate::Middleware
//! [`ChainBuilder`]: crate::ChainBuilder

mod auth;
mod logging;
mod redirect;
mod retry;
mod throttle;

pub use auth::AuthenticationHandler;
pub use logging::{LogLevel, LoggingHandler};
pub use redirect::{DEFAULT_MAX_REDIRECTS, RedirectHandler, RedirectOptions, RedirectState};
pub use retry::{RetryHandler, RetryOptions, RetryState, TransportFailure};
pub use throttle::{ThrottleHandler, ThrottleOptions, ThrottleState, retry_after};
