//! Authentication provider capability.
//!
//! The pipeline does not implement any OAuth flow. It asks an
//! [`AuthenticationProvider`] for a bearer token on every attempt and lets the
//! provider deal with caching and refresh.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Error, Result};

/// Future returned by [`AuthenticationProvider::get_access_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Options handed to the provider for one token request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationOptions {
    /// Scopes the token must cover. Empty means "provider default".
    pub scopes: Vec<String>,
}

impl AuthenticationOptions {
    /// Options requesting the given scopes.
    #[must_use]
    pub fn with_scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Supplies bearer tokens to the authentication unit.
///
/// Implementations are shared by every request of a client and may be called
/// concurrently.
pub trait AuthenticationProvider: Send + Sync + 'static {
    /// Fetch (or return a cached) access token.
    fn get_access_token<'a>(&'a self, options: &'a AuthenticationOptions) -> TokenFuture<'a>;
}

impl<P: AuthenticationProvider + ?Sized> AuthenticationProvider for Arc<P> {
    fn get_access_token<'a>(&'a self, options: &'a AuthenticationOptions) -> TokenFuture<'a> {
        (**self).get_access_token(options)
    }
}

/// Provider returning the same token every time.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: Arc<str>,
}

impl StaticTokenProvider {
    /// Create a provider for a fixed token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::from(token.into()),
        }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl AuthenticationProvider for StaticTokenProvider {
    fn get_access_token<'a>(&'a self, _options: &'a AuthenticationOptions) -> TokenFuture<'a> {
        let token = self.token.to_string();
        Box::pin(async move { Ok(token) })
    }
}

/// Provider backed by an async callback.
///
/// Any error the callback returns is reported as [`Error::Authentication`].
///
/// # Example
///
/// ```ignore
/// use graft::CallbackAuthenticationProvider;
///
/// let provider = CallbackAuthenticationProvider::new(|options| async move {
///     token_cache.get(&options.scopes).await
/// });
/// ```
pub struct CallbackAuthenticationProvider<F> {
    callback: F,
}

impl<F> CallbackAuthenticationProvider<F> {
    /// Wrap `callback`.
    pub const fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> fmt::Debug for CallbackAuthenticationProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackAuthenticationProvider")
            .finish_non_exhaustive()
    }
}

impl<F, Fut, E> AuthenticationProvider for CallbackAuthenticationProvider<F>
where
    F: Fn(AuthenticationOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<String, E>> + Send + 'static,
    E: fmt::Display,
{
    fn get_access_token<'a>(&'a self, options: &'a AuthenticationOptions) -> TokenFuture<'a> {
        let pending = (self.callback)(options.clone());
        Box::pin(async move {
            pending
                .await
                .map_err(|err| Error::authentication(err.to_string()))
        })
    }
}
