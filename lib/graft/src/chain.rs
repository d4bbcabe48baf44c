//! The middleware chain.
//!
//! A [`Chain`] is an ordered list of [`Middleware`] units terminated by a
//! single [`Transport`]. Each unit receives the request context by exclusive
//! reference together with [`Next`], the continuation standing for the rest
//! of the chain. Units run their pre-step top-down and their post-step
//! bottom-up, like nested scopes:
//!
//! ```text
//! send ─► auth ─► redirect ─► retry ─► throttle ─► transport
//!   ◄──────◄──────────◄─────────◄──────────◄───────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use graft::{Chain, Transport};
//! use graft::middleware::{RetryHandler, RetryOptions};
//!
//! let chain = Chain::builder()
//!     .with(RetryHandler::new(RetryOptions::default()))
//!     .terminate(Transport::new(my_tower_service));
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tower::ServiceExt;
use tower::util::BoxCloneSyncService;
use tower_service::Service;

use crate::{Error, Request, RequestContext, Response, Result};

/// Future returned by [`Middleware::process`] and [`Next::run`].
pub type MiddlewareFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Future returned by a [`Transport`] call.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// One concern of the request pipeline.
///
/// Implementations must not keep per-request state in `self`: the same unit
/// serves every concurrent request of a client. Anything that has to survive
/// between attempts of one request goes into
/// [`RequestContext::control_mut`].
///
/// A unit either delegates through `next` (once per logical attempt, possibly
/// several times across attempts it orchestrates) or returns without calling
/// it to short-circuit.
pub trait Middleware: Send + Sync + 'static {
    /// Short name used for logging and [`Chain::names`].
    fn name(&self) -> &'static str;

    /// Handle one request.
    fn process<'a>(&'a self, ctx: &'a mut RequestContext, next: Next<'a>)
    -> MiddlewareFuture<'a>;
}

/// Continuation representing the remainder of the chain.
///
/// `Next` only borrows the chain; it is `Copy` so a unit can run the rest of
/// the chain as many times as it needs to.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    units: &'a [Arc<dyn Middleware>],
    transport: &'a Transport,
}

impl<'a> Next<'a> {
    /// Run the remainder of the chain on `ctx`.
    pub fn run<'b>(self, ctx: &'b mut RequestContext) -> MiddlewareFuture<'b>
    where
        'a: 'b,
    {
        match self.units.split_first() {
            Some((unit, rest)) => unit.process(
                ctx,
                Next {
                    units: rest,
                    transport: self.transport,
                },
            ),
            None => self.transport.process(ctx),
        }
    }

    /// Names of the units still to run, ending with the transport.
    #[must_use]
    pub fn remaining(&self) -> Vec<&'static str> {
        self.units
            .iter()
            .map(|unit| unit.name())
            .chain(std::iter::once(Transport::NAME))
            .collect()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .finish()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Type-erased transport service.
pub type BoxedService = BoxCloneSyncService<Request<Bytes>, Response<Bytes>, Error>;

/// Terminal unit: performs the network call and stores the response.
///
/// Wraps any tower service speaking [`Request`]/[`Response`], so tower layers
/// (timeouts, concurrency limits) can be stacked under the chain, and tests
/// can plug a `tower::service_fn` in place of the network.
#[derive(Clone)]
pub struct Transport {
    service: BoxedService,
}

impl Transport {
    const NAME: &'static str = "transport";

    /// Wrap a tower service as the terminal unit.
    pub fn new<S>(service: S) -> Self
    where
        S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        Self {
            service: BoxCloneSyncService::new(service),
        }
    }

    /// Send one request, bypassing the chain.
    pub fn call(&self, request: Request) -> ServiceFuture {
        Box::pin(self.service.clone().oneshot(request))
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            let request = ctx.to_request();
            let response = ctx.cancellable(self.call(request)).await?;
            ctx.set_response(response);
            Ok(())
        })
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Ordered middleware units plus the terminal transport.
///
/// The chain owns every unit. It is immutable once built and shared by all
/// requests of a client.
pub struct Chain {
    units: Vec<Arc<dyn Middleware>>,
    transport: Transport,
}

impl Chain {
    /// Start building a chain.
    #[must_use]
    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    /// Run the whole chain on `ctx`, leaving the response in the context.
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<()> {
        self.head().run(ctx).await
    }

    /// Continuation starting at the first unit.
    #[must_use]
    pub fn head(&self) -> Next<'_> {
        Next {
            units: &self.units,
            transport: &self.transport,
        }
    }

    /// Unit names in execution order, ending with `"transport"`.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.head().remaining()
    }

    /// Number of units, including the transport.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len() + 1
    }

    /// A chain always holds at least its transport.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("units", &self.names()).finish()
    }
}

/// Builder for [`Chain`].
///
/// Units run in the order they are added: the first one added is the
/// outermost. [`ChainBuilder::terminate`] is the only way to obtain a
/// [`Chain`], so every chain ends with exactly one transport.
#[derive(Default)]
pub struct ChainBuilder {
    units: Vec<Arc<dyn Middleware>>,
}

impl ChainBuilder {
    /// Start an empty chain; same as [`Chain::builder`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit.
    #[must_use]
    pub fn with(self, unit: impl Middleware) -> Self {
        self.with_arc(Arc::new(unit))
    }

    /// Append a shared unit.
    #[must_use]
    pub fn with_arc(mut self, unit: Arc<dyn Middleware>) -> Self {
        self.units.push(unit);
        self
    }

    /// Finish the chain with its transport.
    #[must_use]
    pub fn terminate(self, transport: Transport) -> Chain {
        Chain {
            units: self.units,
            transport,
        }
    }
}

impl fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder")
            .field(
                "units",
                &self.units.iter().map(|u| u.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::HeaderMap;
    use url::Url;

    use super::*;
    use crate::Method;

    /// Records its name on the way in and on the way out.
    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Trace {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            next: Next<'a>,
        ) -> MiddlewareFuture<'a> {
            Box::pin(async move {
                self.log.lock().expect("log").push(format!("> {}", self.name));
                let result = next.run(ctx).await;
                self.log.lock().expect("log").push(format!("< {}", self.name));
                result
            })
        }
    }

    /// Refuses every request without delegating.
    struct Reject;

    impl Middleware for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut RequestContext,
            _next: Next<'a>,
        ) -> MiddlewareFuture<'a> {
            Box::pin(async { Err(Error::invalid_request("rejected")) })
        }
    }

    fn counting_transport(calls: Arc<AtomicUsize>) -> Transport {
        Transport::new(tower::service_fn(move |_request: Request| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Error>(Response::new(204, HeaderMap::new(), Bytes::new())) }
        }))
    }

    fn context() -> RequestContext {
        RequestContext::new(
            Method::Get,
            Url::parse("https://api.example.com/me").expect("url"),
        )
    }

    #[tokio::test]
    async fn units_nest_like_scopes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = Chain::builder()
            .with(Trace {
                name: "outer",
                log: Arc::clone(&log),
            })
            .with(Trace {
                name: "inner",
                log: Arc::clone(&log),
            })
            .terminate(counting_transport(Arc::clone(&calls)));

        let mut ctx = context();
        chain.run(&mut ctx).await.expect("run");

        assert_eq!(ctx.response().map(Response::status), Some(204));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *log.lock().expect("log"),
            vec!["> outer", "> inner", "< inner", "< outer"]
        );
    }

    #[tokio::test]
    async fn short_circuit_skips_transport() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = Chain::builder()
            .with(Reject)
            .terminate(counting_transport(Arc::clone(&calls)));

        let mut ctx = context();
        let err = chain.run(&mut ctx).await.expect_err("rejected");

        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(ctx.response().is_none());
    }

    #[tokio::test]
    async fn transport_is_skipped_once_cancelled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = Chain::builder().terminate(counting_transport(Arc::clone(&calls)));

        let mut ctx = context();
        ctx.cancellation().cancel();
        let err = chain.run(&mut ctx).await.expect_err("cancelled");

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_serves_concurrent_callers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = counting_transport(Arc::clone(&calls));
        let shared = transport.clone();

        let request = context().to_request();
        let (first, second) = tokio::join!(
            transport.call(request.clone()),
            tokio::spawn(async move { shared.call(request).await }),
        );

        assert_eq!(first.expect("first").status(), 204);
        assert_eq!(second.expect("join").expect("second").status(), 204);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn names_end_with_transport() {
        let chain = Chain::builder()
            .with(Reject)
            .terminate(counting_transport(Arc::default()));

        assert_eq!(chain.names(), vec!["reject", "transport"]);
        assert_eq!(chain.len(), 2);
        assert_eq!(format!("{chain:?}"), r#"Chain { units: ["reject", "transport"] }"#);
    }
}
