//! Prelude module for convenient imports.
//!
//! ```ignore
//! use graft::prelude::*;
//! ```

pub use crate::{
    AuthenticationOptions, AuthenticationProvider, CancellationToken, Chain, Client,
    ClientOptions, Error, HttpClient, Method, Middleware, MiddlewareFuture, Next, RequestContext,
    RequestOptions, Response, Result, StaticTokenProvider, Transport, header,
};
pub use serde::{Deserialize, Serialize};
