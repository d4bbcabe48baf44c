//! HTTP request as handed to a transport.
//!
//! A [`Request`] is the flattened form of a request context at the moment the
//! terminal unit sends it. Header names are case-insensitive.
//!
//! # Example
//!
//! ```
//! use graft_core::{Request, Method};
//! use graft_core::header::{ACCEPT, HeaderMap, HeaderValue};
//! use bytes::Bytes;
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
//! let request = Request::<Bytes>::from_parts(
//!     Method::Get,
//!     "https://api.example.com/me".parse().unwrap(),
//!     headers,
//!     None,
//! );
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use bytes::Bytes;
use http::HeaderMap;

use crate::Method;

/// An HTTP request with method, URL, headers, and optional body.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HeaderMap,
    body: Option<B>,
}

impl<B> Request<B> {
    /// Reassemble a request from its parts.
    #[must_use]
    pub fn from_parts(method: Method, url: url::Url, headers: HeaderMap, body: Option<B>) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Single header value by name, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HeaderMap, Option<B>) {
        (self.method, self.url, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use http::header::{ACCEPT, HeaderValue};

    use super::*;

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).expect("valid URL")
    }

    #[test]
    fn request_headers_are_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let request =
            Request::<Bytes>::from_parts(Method::Get, url("https://api.example.com/me"), headers, None);

        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.header("ACCEPT"), Some("application/json"));
        assert!(request.body().is_none());
    }

    #[test]
    fn request_parts_round_trip() {
        let request = Request::from_parts(
            Method::Put,
            url("https://api.example.com/a"),
            HeaderMap::new(),
            Some(Bytes::from_static(b"x")),
        );
        let (method, url, headers, body) = request.into_parts();
        let rebuilt = Request::from_parts(method, url, headers, body);
        assert_eq!(rebuilt.method(), Method::Put);
        assert_eq!(rebuilt.url().path(), "/a");
        assert_eq!(rebuilt.body(), Some(&Bytes::from_static(b"x")));
    }
}
