//! Prelude module for convenient imports.
//!
//! ```ignore
//! use graft_core::prelude::*;
//! ```

pub use crate::{
    ContentType, Error, HeaderMap, Method, Request, Response, Result, StatusCode, from_json,
    header, to_json,
};
