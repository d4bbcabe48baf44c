//! The HTTP client and the factory assembling its default chain.

use std::sync::Arc;

use tracing::debug;

use crate::middleware::{
    AuthenticationHandler, LoggingHandler, RedirectHandler, RetryHandler, ThrottleHandler,
};
use crate::{
    AuthenticationProvider, Chain, HyperTransport, MiddlewareOptions, RequestContext, Response,
    Result, Transport, TransportConfig,
};

/// Sends request contexts through a middleware chain.
///
/// Cheap to clone: clones share the same chain.
#[derive(Debug, Clone)]
pub struct HttpClient {
    chain: Arc<Chain>,
}

impl HttpClient {
    /// Create a client around a caller-built chain.
    #[must_use]
    pub fn new(chain: Chain) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }

    /// Run `ctx` through the chain and return the response it produced.
    ///
    /// The context is consumed: the caller gets a response or a single
    /// terminal error.
    pub async fn send(&self, mut ctx: RequestContext) -> Result<Response> {
        self.chain.run(&mut ctx).await?;
        ctx.into_response()
    }

    /// The chain this client sends through.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

/// Builds [`HttpClient`]s with the default chain.
///
/// The default chain is, outermost first:
///
/// ```text
/// [logging] → authentication → redirect → retry → throttle → transport
/// ```
///
/// - Authentication sits above retry, so every retry of a request reuses
///   the credential attached before the first attempt, even if it expires
///   meanwhile. Only a chain built with
///   [`with_middleware`](Self::with_middleware) that places the
///   authentication unit below retry fetches a credential per attempt.
/// - Redirect sits above retry, so each redirect hop gets its own retry
///   budget and a redirect response is never retried.
/// - Throttle sits right above the transport, so server-dictated waits never
///   consume the retry budget.
#[derive(Debug, Clone, Copy)]
pub struct HttpClientFactory;

impl HttpClientFactory {
    /// The default chain, terminated by `transport`.
    #[must_use]
    pub fn default_chain(
        provider: Arc<dyn AuthenticationProvider>,
        options: &MiddlewareOptions,
        debug_logging: bool,
        transport: Transport,
    ) -> Chain {
        let mut builder = Chain::builder();
        if debug_logging {
            builder = builder.with(LoggingHandler::debug());
        }
        let chain = builder
            .with(
                AuthenticationHandler::from_arc(provider)
                    .with_options(options.authentication.clone()),
            )
            .with(RedirectHandler::new(options.redirect))
            .with(RetryHandler::new(options.retry.clone()))
            .with(ThrottleHandler::new(options.throttle))
            .terminate(transport);
        debug!(units = ?chain.names(), "built default chain");
        chain
    }

    /// Client with the default chain over the network transport.
    #[must_use]
    pub fn with_authentication_provider(
        provider: Arc<dyn AuthenticationProvider>,
        options: &MiddlewareOptions,
        debug_logging: bool,
        config: TransportConfig,
    ) -> HttpClient {
        let transport = Transport::from(HyperTransport::new(config));
        HttpClient::new(Self::default_chain(
            provider,
            options,
            debug_logging,
            transport,
        ))
    }

    /// Client around a caller-built chain.
    #[must_use]
    pub fn with_middleware(chain: Chain) -> HttpClient {
        HttpClient::new(chain)
    }
}
