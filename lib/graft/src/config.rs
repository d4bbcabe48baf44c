//! Client configuration types.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use crate::middleware::{RedirectOptions, RetryOptions, ThrottleOptions};
use crate::{AuthenticationOptions, AuthenticationProvider, Chain, RequestOptions, Transport};

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/";

/// Default API version segment.
pub const DEFAULT_VERSION: &str = "v1.0";

/// Configuration for [`HyperTransport`](crate::HyperTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Whole-exchange timeout, response body included.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl TransportConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
}

impl TransportConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
        }
    }
}

/// Client-wide options for the units of the default chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiddlewareOptions {
    /// Options passed to the authentication provider.
    pub authentication: AuthenticationOptions,
    /// Redirect limit and strictness.
    pub redirect: RedirectOptions,
    /// Backoff and retry budget.
    pub retry: RetryOptions,
    /// Server-dictated wait limits.
    pub throttle: ThrottleOptions,
}

/// Options accepted by [`Client::new`](crate::Client::new).
///
/// Exactly one of [`auth_provider`](ClientOptionsBuilder::auth_provider) and
/// [`middleware`](ClientOptionsBuilder::middleware) must be set: the first
/// yields the default chain, the second is used as the whole chain.
pub struct ClientOptions {
    /// Service root every relative path is resolved against.
    pub base_url: String,
    /// API version segment placed after the base URL.
    pub default_version: String,
    /// Head the default chain with a logging unit.
    pub debug_logging: bool,
    /// Token source for the default chain.
    pub auth_provider: Option<Arc<dyn AuthenticationProvider>>,
    /// Caller-built chain, used instead of the default one.
    pub middleware: Option<Chain>,
    /// Options for the units of the default chain.
    pub middleware_options: MiddlewareOptions,
    /// Headers added to every request built with [`Client::api`](crate::Client::api).
    pub default_headers: HeaderMap,
    /// Per-request overrides every [`Client::api`](crate::Client::api) request starts from.
    pub request_options: RequestOptions,
    /// Configuration of the default network transport.
    pub transport_config: TransportConfig,
    /// Terminal unit of the default chain, replacing the network transport.
    pub transport: Option<Transport>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_version: DEFAULT_VERSION.to_string(),
            debug_logging: false,
            auth_provider: None,
            middleware: None,
            middleware_options: MiddlewareOptions::default(),
            default_headers: HeaderMap::new(),
            request_options: RequestOptions::default(),
            transport_config: TransportConfig::default(),
            transport: None,
        }
    }
}

impl ClientOptions {
    /// Create a new options builder.
    #[must_use]
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("default_version", &self.default_version)
            .field("debug_logging", &self.debug_logging)
            .field("auth_provider", &self.auth_provider.as_ref().map(|_| ".."))
            .field("middleware", &self.middleware)
            .field("middleware_options", &self.middleware_options)
            .field("default_headers", &self.default_headers)
            .field("request_options", &self.request_options)
            .field("transport_config", &self.transport_config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ClientOptions`].
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Set the service root.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.options.base_url = base_url.into();
        self
    }

    /// Set the default API version.
    #[must_use]
    pub fn default_version(mut self, version: impl Into<String>) -> Self {
        self.options.default_version = version.into();
        self
    }

    /// Enable or disable the logging unit.
    #[must_use]
    pub const fn debug_logging(mut self, enabled: bool) -> Self {
        self.options.debug_logging = enabled;
        self
    }

    /// Use the default chain with this token source.
    #[must_use]
    pub fn auth_provider(self, provider: impl AuthenticationProvider) -> Self {
        self.auth_provider_arc(Arc::new(provider))
    }

    /// Use the default chain with a shared token source.
    #[must_use]
    pub fn auth_provider_arc(mut self, provider: Arc<dyn AuthenticationProvider>) -> Self {
        self.options.auth_provider = Some(provider);
        self
    }

    /// Use a caller-built chain.
    #[must_use]
    pub fn middleware(mut self, chain: Chain) -> Self {
        self.options.middleware = Some(chain);
        self
    }

    /// Set the options of the default chain's units.
    #[must_use]
    pub fn middleware_options(mut self, options: MiddlewareOptions) -> Self {
        self.options.middleware_options = options;
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.options.default_headers.insert(name, value);
        self
    }

    /// Default per-request overrides, applied before any set on the request.
    #[must_use]
    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.options.request_options = options;
        self
    }

    /// Configure the network transport.
    #[must_use]
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.options.transport_config = config;
        self
    }

    /// Terminate the default chain with `transport` instead of the network.
    #[must_use]
    pub fn transport(mut self, transport: impl Into<Transport>) -> Self {
        self.options.transport = Some(transport.into());
        self
    }

    /// Build the options.
    #[must_use]
    pub fn build(self) -> ClientOptions {
        self.options
    }
}
