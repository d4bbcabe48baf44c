//! Client entry point and fluent request builder.

use std::fmt;
use std::future::Future;

use bytes::Bytes;
use http::HeaderMap;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    AuthenticationOptions, CallbackAuthenticationProvider, ClientOptions, ClientOptionsBuilder,
    ContentType, Error, HttpClient, HttpClientFactory, HyperTransport, Method, RequestContext,
    RequestOptions, Response, Result, Transport,
};

/// API client: a configured [`HttpClient`] plus the service root and the
/// default version every relative path is resolved against.
///
/// # Example
///
/// ```ignore
/// use graft::{Client, ClientOptions, StaticTokenProvider};
///
/// let client = Client::new(
///     ClientOptions::builder()
///         .auth_provider(StaticTokenProvider::new(token))
///         .build(),
/// )?;
///
/// let me = client.api("/me").get().await?;
/// ```
#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    base_url: Url,
    default_version: String,
    default_headers: HeaderMap,
    request_options: RequestOptions,
}

impl Client {
    /// Create a client from validated options.
    ///
    /// Fails with [`Error::Configuration`] unless exactly one of
    /// `auth_provider` and `middleware` is set, and with
    /// [`Error::InvalidUrl`] if the base URL does not parse.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let mut base_url = Url::parse(&options.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = match (options.auth_provider, options.middleware) {
            (Some(provider), None) => {
                let transport = options.transport.unwrap_or_else(|| {
                    Transport::from(HyperTransport::new(options.transport_config))
                });
                HttpClient::new(HttpClientFactory::default_chain(
                    provider,
                    &options.middleware_options,
                    options.debug_logging,
                    transport,
                ))
            }
            (None, Some(chain)) => HttpClientFactory::with_middleware(chain),
            (None, None) => {
                return Err(Error::configuration(
                    "provide either an authentication provider or a custom middleware chain",
                ));
            }
            (Some(_), Some(_)) => {
                return Err(Error::configuration(
                    "an authentication provider and a custom middleware chain are mutually exclusive",
                ));
            }
        };

        Ok(Self {
            http,
            base_url,
            default_version: options.default_version,
            default_headers: options.default_headers,
            request_options: options.request_options,
        })
    }

    /// Create a client with the default chain, getting tokens from an async
    /// callback.
    ///
    /// `options` carries everything else (base URL, version, logging,
    /// default headers and request options). Setting a custom chain on it
    /// fails like [`Client::new`] does.
    ///
    /// ```ignore
    /// let client = Client::init(
    ///     ClientOptions::builder().default_version("beta"),
    ///     |options: AuthenticationOptions| async move {
    ///         cache.token_for(&options.scopes).await
    ///     },
    /// )?;
    /// ```
    pub fn init<F, Fut, E>(options: ClientOptionsBuilder, callback: F) -> Result<Self>
    where
        F: Fn(AuthenticationOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<String, E>> + Send + 'static,
        E: fmt::Display + 'static,
    {
        Self::new(
            options
                .auth_provider(CallbackAuthenticationProvider::new(callback))
                .build(),
        )
    }

    /// Start a request for `path`, relative to the base URL and version, or
    /// an absolute `http(s)` URL used as-is.
    #[must_use]
    pub fn api(&self, path: impl Into<String>) -> ApiRequest<'_> {
        ApiRequest {
            client: self,
            path: path.into(),
            version: None,
            query: Vec::new(),
            headers: self.default_headers.clone(),
            options: self.request_options.clone(),
            cancellation: None,
        }
    }

    /// The underlying HTTP client.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http
    }

    /// The service root.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("default_version", &self.default_version)
            .field("chain", self.http.chain())
            .finish_non_exhaustive()
    }
}

/// A request under construction, created by [`Client::api`].
#[derive(Debug)]
pub struct ApiRequest<'a> {
    client: &'a Client,
    path: String,
    version: Option<String>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    options: RequestOptions,
    cancellation: Option<CancellationToken>,
}

impl ApiRequest<'_> {
    /// Use another API version for this request.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a header, replacing any default value.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Override the client-wide middleware options for this request,
    /// replacing the client's default request options.
    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Ask for a token covering these scopes.
    #[must_use]
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Cancel the request when `token` fires.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The URL this request targets.
    pub fn build_url(&self) -> Result<Url> {
        let mut url = match Url::parse(&self.path) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                let version = self
                    .version
                    .as_deref()
                    .unwrap_or(&self.client.default_version)
                    .trim_matches('/');
                let path = self.path.trim_start_matches('/');
                let relative = if version.is_empty() {
                    path.to_string()
                } else {
                    format!("{version}/{path}")
                };
                self.client.base_url.join(&relative)?
            }
        };

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// The context this request would be sent with.
    pub fn context(&self, method: Method, body: Option<Bytes>) -> Result<RequestContext> {
        let mut ctx = RequestContext::new(method, self.build_url()?)
            .with_headers(self.headers.clone())
            .with_options(self.options.clone());
        if let Some(body) = body {
            ctx = ctx.with_body(body);
        }
        if let Some(token) = &self.cancellation {
            ctx = ctx.with_cancellation(token.clone());
        }
        Ok(ctx)
    }

    /// Send the request with `method` and an optional raw body.
    pub async fn send(self, method: Method, body: Option<Bytes>) -> Result<Response> {
        let ctx = self.context(method, body)?;
        self.client.http.send(ctx).await
    }

    /// GET the resource.
    pub async fn get(self) -> Result<Response> {
        self.send(Method::Get, None).await
    }

    /// DELETE the resource.
    pub async fn delete(self) -> Result<Response> {
        self.send(Method::Delete, None).await
    }

    /// POST `value` as JSON.
    pub async fn post<T: serde::Serialize>(self, value: &T) -> Result<Response> {
        self.send_json(Method::Post, value).await
    }

    /// PUT `value` as JSON.
    pub async fn put<T: serde::Serialize>(self, value: &T) -> Result<Response> {
        self.send_json(Method::Put, value).await
    }

    /// PATCH `value` as JSON.
    pub async fn patch<T: serde::Serialize>(self, value: &T) -> Result<Response> {
        self.send_json(Method::Patch, value).await
    }

    async fn send_json<T: serde::Serialize>(mut self, method: Method, value: &T) -> Result<Response> {
        let body = crate::to_json(value)?;
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static(ContentType::Json.as_str()),
            );
        }
        self.send(method, Some(body)).await
    }
}
