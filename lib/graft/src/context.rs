//! Per-request state threaded through the middleware chain.
//!
//! A [`RequestContext`] is created for one `send` call, handed down the chain
//! by exclusive reference and turned into the caller's [`Response`] at the
//! end. It is never shared between concurrent requests, so nothing in it is
//! synchronized.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Extensions, HeaderMap};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{Error, Method, Request, Response, Result};

/// Per-request overrides of the client-wide middleware options.
///
/// Every field left to `None` falls back to the value the unit was built
/// with. The overlay is read-only for the units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Scopes passed to the authentication provider.
    pub scopes: Option<Vec<String>>,
    /// Redirect responses accepted per request.
    pub max_redirects: Option<usize>,
    /// Fail with [`Error::TooManyRedirects`] (`true`) or hand back the last 3xx (`false`).
    pub strict_redirects: Option<bool>,
    /// Maximum number of generic retries.
    pub max_retries: Option<u32>,
    /// Allow the retry unit to replay non-idempotent methods.
    pub retry_non_idempotent: Option<bool>,
    /// Longest server-dictated wait the throttling unit accepts.
    pub max_throttle_wait: Option<Duration>,
}

/// The mutable value every middleware unit receives.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    options: RequestOptions,
    response: Option<Response>,
    control: Extensions,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Create a context for `method` on `url`, with no headers or body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            options: RequestOptions::default(),
            response: None,
            control: Extensions::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Set a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge a header map into the context's headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the per-request option overlay.
    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a caller-owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Replace the HTTP method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Replace the target URL.
    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    /// Outgoing headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the outgoing headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Outgoing body.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Remove and return the outgoing body.
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Per-request option overlay.
    #[must_use]
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Response left by the transport, if it ran.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Store the response. Called by the transport.
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    /// Remove the response, typically before re-invoking the rest of the chain.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Typed signals shared between units (retry counters and the like).
    #[must_use]
    pub fn control(&self) -> &Extensions {
        &self.control
    }

    /// Mutable access to the unit signals.
    pub fn control_mut(&mut self) -> &mut Extensions {
        &mut self.control
    }

    /// The cancellation token observed at every suspension point.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Snapshot of the outgoing request, as the transport sends it.
    #[must_use]
    pub fn to_request(&self) -> Request {
        Request::from_parts(
            self.method,
            self.url.clone(),
            self.headers.clone(),
            self.body.clone(),
        )
    }

    /// Drive `future` unless the request is cancelled first.
    ///
    /// Cancellation wins ties, so a future is never polled once the token
    /// has fired.
    pub async fn cancellable<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(Error::Cancelled),
            result = future => result,
        }
    }

    /// Sleep for `delay`, waking early with [`Error::Cancelled`].
    pub async fn sleep(&self, delay: Duration) -> Result<()> {
        self.cancellable(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }

    /// Consume the context into the response the chain produced.
    pub fn into_response(self) -> Result<Response> {
        self.response.ok_or_else(|| {
            Error::configuration("the middleware chain completed without producing a response")
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use http::header::ACCEPT;

    use super::*;

    fn context() -> RequestContext {
        RequestContext::new(
            Method::Get,
            Url::parse("https://api.example.com/v1.0/me").expect("url"),
        )
    }

    #[test]
    fn to_request_snapshots_outgoing_state() {
        let ctx = context()
            .with_header(ACCEPT, HeaderValue::from_static("application/json"))
            .with_body(Bytes::from_static(b"{}"));

        let request = ctx.to_request();
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.url().path(), "/v1.0/me");
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.body(), Some(&Bytes::from_static(b"{}")));
    }

    #[test]
    fn into_response_without_transport_is_a_configuration_error() {
        let err = context().into_response().expect_err("no response");
        assert!(err.is_configuration());
    }

    #[test]
    fn control_holds_typed_signals() {
        #[derive(Debug, Clone, PartialEq)]
        struct Seen(u32);

        let mut ctx = context();
        ctx.control_mut().insert(Seen(2));
        assert_eq!(ctx.control().get::<Seen>(), Some(&Seen(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = context().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let result = ctx.sleep(Duration::from_secs(60)).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        canceller.await.expect("canceller");
    }

    #[tokio::test]
    async fn cancellable_never_polls_after_cancel() {
        let ctx = context();
        ctx.cancellation().cancel();

        let polled = AtomicBool::new(false);
        let result = ctx
            .cancellable(async {
                polled.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(!polled.load(Ordering::SeqCst));
    }
}
