//! Middleware layer.
//!
//! Middleware is a transformation from one [`BoxedHandler`] to another. The
//! returned handler may run logic before and after calling the one it wraps,
//! or not call it at all (an auth layer rejecting a request). It is the right
//! place for cross-cutting concerns: tracing, metrics, request ids, auth.
//!
//! Two ways to write one:
//!
//! ```rust
//! use strata::middleware::{from_fn, Next};
//! use strata::{BoxedHandler, Request, Response, Router, Status};
//!
//! // 1. A plain function over handlers.
//! fn deny_all(_next: BoxedHandler) -> BoxedHandler {
//!     BoxedHandler::new(|_req: Request| async { Status::FORBIDDEN })
//! }
//!
//! // 2. An async function that receives the rest of the chain as `Next`.
//! async fn require_token(req: Request, next: Next) -> Response {
//!     if req.header("authorization").is_none() {
//!         return Response::status(Status::UNAUTHORIZED);
//!     }
//!     next.run(req).await
//! }
//!
//! let app = Router::new()
//!     .with(from_fn(require_token))
//!     .group(|admin| admin.with(deny_all));
//! ```

mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

pub use trace::{trace, Trace};

/// A transformation from one handler to another.
///
/// Implemented for every `Fn(BoxedHandler) -> BoxedHandler`. Any state the
/// wrapped handler keeps is the middleware's own concern; the router only
/// requires the value to be shareable.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// The rest of the chain, handed to middleware built with [`from_fn`].
pub struct Next(BoxedHandler);

impl Next {
    /// Runs the remaining layers and the route handler.
    pub async fn run(self, req: Request) -> Response {
        self.0.call(req).await
    }
}

/// Builds middleware from an `async fn(Request, Next) -> impl IntoResponse`.
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn(Arc::new(f))
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F> Clone for FromFn<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxedHandler::erase(FromFnHandler { f: Arc::clone(&self.0), next })
    }
}

struct FromFnHandler<F> {
    f: Arc<F>,
    next: BoxedHandler,
}

impl<F, Fut, R> ErasedHandler for FromFnHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.f)(req, Next(self.next.clone()));
        Box::pin(async move { fut.await.into_response() })
    }
}
