//! HTTP response handling.
//!
//! [`Response`] is passed through the chain as an opaque value: status,
//! case-insensitive headers and a buffered body.

use bytes::Bytes;
use http::HeaderMap;

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: HeaderMap,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Single header value by name, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

impl Response<Bytes> {
    /// Deserialize the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        crate::from_json(&self.body)
    }

    /// Get the response body as text.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use http::header::{CONTENT_TYPE, HeaderValue};

    use super::*;

    #[test]
    fn response_header_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = Response::new(200, headers, Bytes::from(r#"{"id":"1"}"#));

        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.is_success());
    }

    #[test]
    fn response_success_is_2xx_only() {
        assert!(Response::new(204, HeaderMap::new(), Bytes::new()).is_success());
        assert!(!Response::new(302, HeaderMap::new(), Bytes::new()).is_success());
        assert!(!Response::new(503, HeaderMap::new(), Bytes::new()).is_success());
    }

    #[test]
    fn response_json_and_text() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct User {
            id: String,
        }

        let response = Response::new(200, HeaderMap::new(), Bytes::from(r#"{"id":"42"}"#));
        let user: User = response.json().expect("deserialize");
        assert_eq!(user, User { id: "42".into() });
        assert_eq!(response.text().expect("utf8"), r#"{"id":"42"}"#);
    }
}
