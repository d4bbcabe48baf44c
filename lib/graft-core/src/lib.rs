//! Core types for the graft middleware HTTP client.
//!
//! This crate provides the values that travel through a graft pipeline:
//! - [`Method`] - HTTP method enum
//! - [`Request`] - request handed to a transport
//! - [`Response`] - buffered HTTP response, passed through opaquely
//! - [`Error`] and [`Result`] - the terminal error taxonomy
//! - [`header`] and [`StatusCode`] - re-exported from the `http` crate

mod body;
mod error;
mod method;
pub mod prelude;
mod request;
mod response;

pub use body::{ContentType, from_json, to_json};
pub use error::{Error, Result};
pub use method::Method;
pub use request::Request;
pub use response::Response;

// Re-export http crate types for status codes and headers
pub use http::{Extensions, HeaderMap, StatusCode, header};
