//! JSON body helpers.
//!
//! The pipeline treats bodies as opaque bytes; these helpers only cover the
//! JSON convenience used by `ApiRequest` and [`crate::Response::json`].

use bytes::Bytes;

use crate::Result;

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Example
///
/// ```
/// use graft_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Message { subject: String }
///
/// let message = Message { subject: "hello".to_string() };
/// let bytes = to_json(&message).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"subject":"hello"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes, reporting the path of the offending field on failure.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_as_str() {
        assert_eq!(ContentType::Json.as_str(), "application/json");
        assert_eq!(ContentType::Json.to_string(), "application/json");
    }

    #[test]
    fn from_json_reports_field_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Mailbox {
            #[allow(dead_code)]
            owner: String,
        }

        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            mailbox: Mailbox,
        }

        let result: Result<User> = from_json(br#"{"mailbox":{}}"#);
        let msg = result.expect_err("should fail").to_string();
        assert!(msg.contains("mailbox"), "missing path in: {msg}");
        assert!(msg.contains("owner"), "missing field in: {msg}");
    }

    #[test]
    fn from_json_syntax_error() {
        let result: Result<serde_json::Value> = from_json(b"not json");
        let err = result.expect_err("should fail");
        assert!(err.to_string().contains("JSON deserialization error"));
    }
}
