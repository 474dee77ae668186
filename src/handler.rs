//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! Routes, middleware layers and the multiplexer itself all have different
//! concrete types, but the composition graph has to hold them uniformly. We
//! hide each one behind a trait object (`dyn ErasedHandler`) and pass that
//! around as a [`BoxedHandler`].
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! BoxedHandler(Arc::new(FnHandler(hello)))         ← heap-allocated wrapper
//!        ↓  wrapped by every route-chain layer, then stored in the mux
//! handler.call(req)  at request time               ← one vtable dispatch per layer
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })  ← BoxFuture
//! ```
//!
//! Middleware receives a `BoxedHandler` and returns another one, so a layer
//! costs one `Arc` and one virtual call per request.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` lets tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// signature of the public `Handler` trait. External crates build handlers
/// from async functions instead of implementing this.
#[doc(hidden)]
pub trait ErasedHandler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

// ── BoxedHandler ──────────────────────────────────────────────────────────────

/// A type-erased handler shared across concurrent requests.
///
/// This is what middleware wraps: a layer receives the next `BoxedHandler`
/// and returns a new one. Cloning bumps a reference count.
#[derive(Clone)]
pub struct BoxedHandler(Arc<dyn ErasedHandler>);

impl BoxedHandler {
    /// Erases any handler, including `async fn(Request) -> impl IntoResponse`
    /// and closures returning a future.
    pub fn new(handler: impl Handler) -> Self {
        handler.into_boxed_handler()
    }

    pub(crate) fn erase(inner: impl ErasedHandler) -> Self {
        Self(Arc::new(inner))
    }

    pub(crate) fn from_arc(inner: Arc<dyn ErasedHandler>) -> Self {
        Self(inner)
    }

    /// Invokes the handler.
    pub fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }

    /// Whether two values point at the same underlying handler.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedHandler(..)")
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the shape
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and by [`BoxedHandler`], so an already-composed handler can be registered
/// again. The trait is **sealed** via the private `Sealed` supertrait.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        BoxedHandler::erase(FnHandler(self))
    }
}

impl private::Sealed for BoxedHandler {}

impl Handler for BoxedHandler {
    fn into_boxed_handler(self) -> BoxedHandler {
        self
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler function to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
