//! Redirect middleware.
//!
//! Follows 3xx responses that carry a `Location` header, up to a maximum
//! number of redirect responses per request. Same-origin redirects resume
//! the chain below this unit. Cross-origin redirects drop the `Authorization`
//! header and, when an authentication unit runs above, hand control back to
//! it so the redirected request gets a fresh credential.

use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use tracing::{debug, warn};
use url::Url;

use super::auth::{ReauthenticationAvailable, ReauthenticationRequested};
use crate::chain::{Middleware, MiddlewareFuture, Next};
use crate::{Error, Method, RequestContext, Result};

/// Default maximum number of redirect responses per request.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Options for [`RedirectHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectOptions {
    /// Redirect responses accepted per request. The response that reaches
    /// the limit is not followed, so a redirect loop costs at most this many
    /// transport calls.
    pub max_redirects: usize,
    /// Fail with [`Error::TooManyRedirects`] once the limit is hit. When
    /// `false` the last redirect response is returned instead.
    pub strict: bool,
}

impl Default for RedirectOptions {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            strict: true,
        }
    }
}

/// Redirect responses seen so far for the current request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectState {
    count: usize,
}

impl RedirectState {
    /// Number of redirect responses seen so far.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

/// Middleware following HTTP redirects.
#[derive(Debug, Clone, Default)]
pub struct RedirectHandler {
    options: RedirectOptions,
}

impl RedirectHandler {
    /// Create the unit.
    #[must_use]
    pub const fn new(options: RedirectOptions) -> Self {
        Self { options }
    }
}

/// Check if a status code is a followable redirect.
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Method for the redirected request.
///
/// 303 always becomes GET; 301 and 302 turn anything but GET/HEAD into GET;
/// 307 and 308 preserve the method and body.
fn redirect_method(status: u16, original: Method) -> Method {
    match (status, original) {
        (307 | 308, method) | (301 | 302, method @ (Method::Get | Method::Head)) => method,
        _ => Method::Get,
    }
}

/// Resolve a `Location` value against the URL that produced it.
fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    let url = base_url.join(location).map_err(|err| {
        Error::InvalidRedirect(format!("cannot resolve location {location:?}: {err}"))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidRedirect(format!(
            "refusing to follow redirect to {other} URL"
        ))),
    }
}

impl Middleware for RedirectHandler {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext, next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            let max = ctx
                .options()
                .max_redirects
                .unwrap_or(self.options.max_redirects);
            let strict = ctx.options().strict_redirects.unwrap_or(self.options.strict);

            loop {
                next.run(ctx).await?;

                let Some(response) = ctx.response() else {
                    return Ok(());
                };
                let status = response.status();
                if !is_redirect(status) {
                    return Ok(());
                }
                let Some(location) = response.header(LOCATION.as_str()) else {
                    return Ok(());
                };
                let location = location.to_string();

                let count = ctx
                    .control()
                    .get::<RedirectState>()
                    .map_or(0, RedirectState::count)
                    + 1;
                ctx.control_mut().insert(RedirectState { count });
                if count >= max {
                    if strict {
                        return Err(Error::TooManyRedirects { count, max });
                    }
                    warn!(count, max, "redirect limit reached, returning last response");
                    return Ok(());
                }

                let target = resolve_redirect_url(ctx.url(), &location)?;
                let cross_origin = target.origin() != ctx.url().origin();
                let method = redirect_method(status, ctx.method());
                debug!(status, from = %ctx.url(), to = %target, cross_origin, "following redirect");

                if method != ctx.method() || matches!(method, Method::Get | Method::Head) {
                    ctx.take_body();
                    ctx.headers_mut().remove(CONTENT_TYPE);
                    ctx.headers_mut().remove(CONTENT_LENGTH);
                }
                ctx.set_method(method);
                ctx.set_url(target);

                if cross_origin {
                    ctx.headers_mut().remove(AUTHORIZATION);
                    if ctx.control().get::<ReauthenticationAvailable>().is_some() {
                        ctx.control_mut().insert(ReauthenticationRequested);
                        return Ok(());
                    }
                }
                ctx.take_response();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = RedirectOptions::default();
        assert_eq!(options.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert!(options.strict);
    }

    #[test]
    fn is_redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect(status), "{status}");
        }
        for status in [200, 300, 304, 404, 500] {
            assert!(!is_redirect(status), "{status}");
        }
    }

    #[test]
    fn redirect_method_rewrites() {
        assert_eq!(redirect_method(303, Method::Post), Method::Get);
        assert_eq!(redirect_method(302, Method::Put), Method::Get);
        assert_eq!(redirect_method(301, Method::Head), Method::Head);
        assert_eq!(redirect_method(307, Method::Post), Method::Post);
        assert_eq!(redirect_method(308, Method::Patch), Method::Patch);
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let base = Url::parse("https://api.example.com/v1.0/me/photo").expect("base url");
        assert_eq!(
            resolve_redirect_url(&base, "/new").expect("absolute path").as_str(),
            "https://api.example.com/new"
        );
        assert_eq!(
            resolve_redirect_url(&base, "small")
                .expect("relative path")
                .as_str(),
            "https://api.example.com/v1.0/me/small"
        );
        assert_eq!(
            resolve_redirect_url(&base, "https://cdn.example.net/blob")
                .expect("absolute url")
                .as_str(),
            "https://cdn.example.net/blob"
        );
    }

    #[test]
    fn resolve_rejects_non_http_schemes() {
        let base = Url::parse("https://api.example.com/").expect("base url");
        let err = resolve_redirect_url(&base, "file:///etc/passwd").expect_err("file scheme");
        assert!(matches!(err, Error::InvalidRedirect(_)));
    }
}
