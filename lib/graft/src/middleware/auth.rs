//! Authentication middleware.
//!
//! Fetches a token from the configured [`AuthenticationProvider`] and sets
//! `Authorization: Bearer <token>` before delegating. The token is fetched
//! once per attempt that reaches this unit and the header value is marked
//! sensitive so it never shows up in logs.

use std::sync::Arc;

use http::header::{AUTHORIZATION, HeaderValue};
use tracing::debug;

use crate::chain::{Middleware, MiddlewareFuture, Next};
use crate::{AuthenticationOptions, AuthenticationProvider, Error, RequestContext, Result};

/// Set while an authentication unit is on the call stack, so lower units know
/// they can ask for a fresh credential.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReauthenticationAvailable;

/// Raised by a lower unit (cross-origin redirect) to make the authentication
/// unit fetch a new token and run the rest of the chain again.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReauthenticationRequested;

/// Middleware attaching a bearer token from an [`AuthenticationProvider`].
///
/// # Example
///
/// ```ignore
/// use graft::{Chain, StaticTokenProvider};
/// use graft::middleware::AuthenticationHandler;
///
/// let chain = Chain::builder()
///     .with(AuthenticationHandler::new(StaticTokenProvider::new("my-token")))
///     .terminate(transport);
/// ```
#[derive(Clone)]
pub struct AuthenticationHandler {
    provider: Arc<dyn AuthenticationProvider>,
    options: AuthenticationOptions,
}

impl AuthenticationHandler {
    /// Create the unit with default provider options.
    pub fn new(provider: impl AuthenticationProvider) -> Self {
        Self::from_arc(Arc::new(provider))
    }

    /// Create the unit from a shared provider.
    #[must_use]
    pub fn from_arc(provider: Arc<dyn AuthenticationProvider>) -> Self {
        Self {
            provider,
            options: AuthenticationOptions::default(),
        }
    }

    /// Default options passed to the provider when the request does not
    /// override the scopes.
    #[must_use]
    pub fn with_options(mut self, options: AuthenticationOptions) -> Self {
        self.options = options;
        self
    }

    fn options_for(&self, ctx: &RequestContext) -> AuthenticationOptions {
        match &ctx.options().scopes {
            Some(scopes) => AuthenticationOptions {
                scopes: scopes.clone(),
            },
            None => self.options.clone(),
        }
    }

    async fn authorize(&self, ctx: &mut RequestContext) -> Result<()> {
        let options = self.options_for(ctx);
        let token = ctx
            .cancellable(self.provider.get_access_token(&options))
            .await
            .map_err(|err| match err {
                Error::Authentication(_) | Error::Cancelled => err,
                other => Error::authentication(other.to_string()),
            })?;

        let mut value = HeaderValue::try_from(format!("Bearer {token}")).map_err(|_| {
            Error::authentication("provider returned a token that is not a valid header value")
        })?;
        value.set_sensitive(true);
        ctx.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

impl std::fmt::Debug for AuthenticationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationHandler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Middleware for AuthenticationHandler {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext, next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            ctx.control_mut().insert(ReauthenticationAvailable);

            let result = loop {
                if let Err(err) = self.authorize(ctx).await {
                    break Err(err);
                }
                if let Err(err) = next.run(ctx).await {
                    break Err(err);
                }
                if ctx
                    .control_mut()
                    .remove::<ReauthenticationRequested>()
                    .is_none()
                {
                    break Ok(());
                }
                debug!(url = %ctx.url(), "re-authenticating for redirected request");
                ctx.take_response();
            };

            ctx.control_mut().remove::<ReauthenticationAvailable>();
            result
        })
    }
}
