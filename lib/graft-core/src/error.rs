//! Error types for graft.
//!
//! Every failure a caller of the pipeline can observe is one variant of
//! [`Error`]. Middleware handles only the variants it owns and passes the
//! rest through untouched.

use std::time::Duration;

use bytes::Bytes;
use derive_more::{Display, Error, From};

use crate::Response;

/// Main error type for graft operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The client or chain was assembled incorrectly.
    #[display("invalid middleware chain: {_0}")]
    #[from(skip)]
    Configuration(#[error(not(source))] String),

    /// The authentication provider could not supply a credential.
    #[display("authentication failed: {_0}")]
    #[from(skip)]
    Authentication(#[error(not(source))] String),

    /// HTTP-level errors (non-2xx status codes).
    #[display("HTTP error {status}: {message}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Response body, if available.
        #[error(not(source))]
        body: Option<Bytes>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "value.0.id").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// The server kept asking us to slow down past what we are willing to wait.
    #[display(
        "rate limited (HTTP {status}): server asked for {retry_after:?} after {rounds} throttled attempts"
    )]
    #[from(skip)]
    RateLimited {
        /// Status of the throttling response (429 or 503).
        status: u16,
        /// Wait requested by the last `Retry-After` header.
        retry_after: Duration,
        /// Throttled responses seen, including the last one.
        rounds: u32,
    },

    /// Too many redirects.
    #[display("too many redirects ({count} seen, limit {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Redirect responses seen.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),

    /// Every retry attempt failed; wraps the last failure.
    #[display("retries exhausted after {attempts} attempts: {source}")]
    #[from(skip)]
    RetryExhausted {
        /// Total attempts made, including the first one.
        attempts: u32,
        /// Last error, or the last retryable response as an [`Error::Http`].
        source: Box<Error>,
    },

    /// The caller cancelled the request.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create an HTTP error from status code and message.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Build an HTTP error out of a response, keeping its body.
    #[must_use]
    pub fn from_response(response: &Response) -> Self {
        let message = http::StatusCode::from_u16(response.status())
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("unexpected status");
        Self::Http {
            status: response.status(),
            message: message.to_string(),
            body: Some(response.body().clone()),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the caller cancelled the request.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this is an authentication error.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::RateLimited { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the response body if this is an HTTP error with a body.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Number of attempts made, if this error came out of the retry unit.
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetryExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use http::HeaderMap;

    use super::*;

    #[test]
    fn error_display() {
        let err = Error::http(404, "Not Found");
        assert_eq!(err.to_string(), "HTTP error 404: Not Found");

        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::configuration("no authentication provider or middleware");
        assert_eq!(
            err.to_string(),
            "invalid middleware chain: no authentication provider or middleware"
        );

        let err = Error::TooManyRedirects { count: 5, max: 5 };
        assert_eq!(err.to_string(), "too many redirects (5 seen, limit 5)");

        let err = Error::RateLimited {
            status: 429,
            retry_after: Duration::from_secs(120),
            rounds: 1,
        };
        assert_eq!(
            err.to_string(),
            "rate limited (HTTP 429): server asked for 120s after 1 throttled attempts"
        );
    }

    #[test]
    fn retry_exhausted_keeps_source() {
        let err = Error::RetryExhausted {
            attempts: 4,
            source: Box::new(Error::connection("reset by peer")),
        };
        assert_eq!(err.attempts(), Some(4));
        assert_eq!(
            err.to_string(),
            "retries exhausted after 4 attempts: connection error: reset by peer"
        );

        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "connection error: reset by peer");
    }

    #[test]
    fn error_from_response() {
        let response = Response::new(503, HeaderMap::new(), Bytes::from("busy"));
        let err = Error::from_response(&response);
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.body(), Some(&Bytes::from("busy")));
        assert_eq!(err.to_string(), "HTTP error 503: Service Unavailable");

        let_assert!(Error::Http { status, message, .. } = err);
        check!(status == 503);
        check!(message == "Service Unavailable");
    }

    #[test]
    fn error_predicates() {
        assert!(Error::Timeout.is_timeout());
        assert!(Error::connection("failed").is_connection());
        assert!(!Error::Timeout.is_connection());
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::authentication("expired").is_authentication());
        assert!(Error::configuration("missing").is_configuration());
        assert_eq!(Error::Timeout.status(), None);
        assert_eq!(Error::Timeout.attempts(), None);
    }
}
