//! HTTP API client built around an ordered, async middleware chain.
//!
//! Every request travels through a [`Chain`] of [`Middleware`] units ending
//! in a single [`Transport`]. The default chain attaches a bearer token,
//! follows redirects, retries transient failures and honors `Retry-After`:
//!
//! ```text
//! authentication → redirect → retry → throttle → transport
//! ```
//!
//! # Example
//!
//! ```ignore
//! use graft::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     #[serde(rename = "displayName")]
//!     display_name: String,
//! }
//!
//! let client = Client::new(
//!     ClientOptions::builder()
//!         .auth_provider(StaticTokenProvider::new(token))
//!         .build(),
//! )?;
//!
//! let me: User = client.api("/me").get().await?.json()?;
//! ```
//!
//! Custom chains are assembled with [`Chain::builder`]; see [`middleware`]
//! for the built-in units.

mod api;
mod auth;
mod chain;
mod client;
mod config;
mod context;
pub mod middleware;
pub mod prelude;
mod transport;

pub use api::{ApiRequest, Client};
pub use auth::{
    AuthenticationOptions, AuthenticationProvider, CallbackAuthenticationProvider,
    StaticTokenProvider, TokenFuture,
};
pub use chain::{
    BoxedService, Chain, ChainBuilder, Middleware, MiddlewareFuture, Next, ServiceFuture,
    Transport,
};
pub use client::{HttpClient, HttpClientFactory};
pub use config::{
    ClientOptions, ClientOptionsBuilder, DEFAULT_BASE_URL, DEFAULT_VERSION, MiddlewareOptions,
    TransportConfig, TransportConfigBuilder,
};
pub use context::{RequestContext, RequestOptions};
pub use transport::HyperTransport;

// Re-export tower for custom transports
pub use tower;

// Re-export core types
pub use graft_core::{
    ContentType, Error, Method, Request, Response, Result, from_json, to_json,
};

// Re-export http types for status codes and headers
pub use graft_core::{Extensions, HeaderMap, StatusCode, header};

pub use tokio_util::sync::CancellationToken;
pub use url;
