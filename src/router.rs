//! Scoped middleware composition over the [`Mux`].
//!
//! A router holds two chains. The **global** chain lives on the root and
//! wraps the whole mux, so it runs on every request, matched or not. The
//! **route** chain is bound to each handler at the moment the handler is
//! registered; later `with` calls never reach back into routes that already
//! exist.
//!
//! [`Router::group`] opens a derived scope that starts from a copy of the
//! current route chain. Whatever the scope adds stays inside it:
//!
//! ```rust
//! # use strata::{BoxedHandler, Request, Router};
//! # fn log(next: BoxedHandler) -> BoxedHandler { next }
//! # fn auth(next: BoxedHandler) -> BoxedHandler { next }
//! # async fn health(_: Request) -> &'static str { "ok" }
//! # async fn dashboard(_: Request) -> &'static str { "admin" }
//! let app = Router::new()
//!     .with(log)                       // every request
//!     .get("/health", health)          // log → health
//!     .group(|admin| {
//!         admin
//!             .with(auth)              // only inside this group
//!             .get("/admin", dashboard) // log → auth → dashboard
//!     })
//!     .into_app();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::chain::Chain;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::middleware::Middleware;
use crate::mux::{Mux, RouteError};
use crate::request::Request;

/// The application router.
///
/// Build it once at startup with chained calls, then hand it to
/// [`Server::serve`](crate::Server::serve) or freeze it with
/// [`into_app`](Router::into_app).
pub struct Router {
    global_chain: Chain,
    route_chain: Chain,
    is_sub_router: bool,
    /// Identifies this router so `group` can tell its own scope from a stranger.
    id: u64,
    mux: Arc<Mux>,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

impl Router {
    pub fn new() -> Self {
        Self {
            global_chain: Chain::new(),
            route_chain: Chain::new(),
            is_sub_router: false,
            id: next_id(),
            mux: Arc::new(Mux::new()),
        }
    }

    /// Appends middleware.
    ///
    /// On the root this extends the global chain. Inside a [`group`](Router::group)
    /// it extends the group's route chain. The same middleware may be added
    /// more than once; it then runs once per registration.
    pub fn with(mut self, mw: impl Middleware) -> Self {
        self.chain_mut().push(mw);
        self
    }

    /// Appends every layer of `chain`, in order. Same target rules as [`with`](Router::with).
    pub fn with_chain(mut self, chain: &Chain) -> Self {
        self.chain_mut().extend(chain);
        self
    }

    fn chain_mut(&mut self) -> &mut Chain {
        if self.is_sub_router { &mut self.route_chain } else { &mut self.global_chain }
    }

    /// Opens a derived scope.
    ///
    /// The scope starts with a copy of this router's route chain and registers
    /// into the same mux. `f` gets the scope by value and must return it so
    /// its registrations can be collected; the scope itself is then dropped.
    ///
    /// # Panics
    ///
    /// Panics if `f` returns any router other than the scope it was given,
    /// since the routes registered so far live in that scope.
    pub fn group(mut self, f: impl FnOnce(Router) -> Router) -> Self {
        let id = next_id();
        let scope = Router {
            global_chain: Chain::new(),
            route_chain: self.route_chain.clone(),
            is_sub_router: true,
            id,
            mux: std::mem::take(&mut self.mux),
        };
        let returned = f(scope);
        assert!(
            returned.is_sub_router && returned.id == id,
            "Router::group: the closure must return the router it was given"
        );
        self.mux = returned.mux;
        self
    }

    /// Registers `handler` under `pattern`, wrapped in the current route chain.
    ///
    /// `pattern` is `"[METHOD ]PATH"`; see [`Mux`] for the syntax.
    ///
    /// # Panics
    ///
    /// Panics if the mux rejects the pattern. Use [`try_handle`](Router::try_handle)
    /// to get the [`RouteError`] instead.
    pub fn handle(self, pattern: &str, handler: impl Handler) -> Self {
        self.try_handle(pattern, handler)
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"))
    }

    pub fn try_handle(mut self, pattern: &str, handler: impl Handler) -> Result<Self, RouteError> {
        let composed = self.route_chain.apply(handler.into_boxed_handler());
        Arc::make_mut(&mut self.mux).try_handle(pattern, composed)?;
        debug!(pattern, layers = self.route_chain.len(), "route registered");
        Ok(self)
    }

    /// Registers a handler for a method + path pair.
    ///
    /// ```rust
    /// # use strata::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn delete_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::DELETE, "/users/{id}", delete_user)
    ///     .on(Method::GET,    "/users/{id}", get_user);
    /// ```
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.handle(&format!("{method} {path}"), handler)
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Dispatches one request through the global chain and the mux.
    ///
    /// Composes the global chain on every call. Servers should use
    /// [`into_app`](Router::into_app), which composes it once.
    pub fn serve(&self, req: Request) -> BoxFuture {
        self.global_chain.apply(Arc::clone(&self.mux).into_handler()).call(req)
    }

    /// Ends setup: wraps the mux in the global chain once and freezes the result.
    pub fn into_app(self) -> App {
        debug!(
            global_layers = self.global_chain.len(),
            routes = self.mux.len(),
            "router finalized"
        );
        App { entry: self.global_chain.apply(self.mux.into_handler()) }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// A finished router: immutable, cheap to clone, shared by every request.
#[derive(Clone, Debug)]
pub struct App {
    entry: BoxedHandler,
}

impl App {
    pub fn call(&self, req: Request) -> BoxFuture {
        self.entry.call(req)
    }
}

impl From<Router> for App {
    fn from(router: Router) -> Self {
        router.into_app()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::middleware::{from_fn, Next};
    use crate::Status;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn tag(name: &'static str, log: Log) -> impl Middleware {
        from_fn(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                next.run(req).await
            }
        })
    }

    fn endpoint(name: &'static str, log: Log) -> BoxedHandler {
        BoxedHandler::new(move |_req: Request| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                name
            }
        })
    }

    fn get(path: &str) -> Request {
        Request::builder().uri(path).build()
    }

    #[test]
    fn with_on_root_targets_global_chain() {
        let log: Log = Arc::default();
        let router = Router::new().with(tag("a", log.clone()));
        assert_eq!(router.global_chain.len(), 1);
        assert!(router.route_chain.is_empty());
    }

    #[test]
    fn with_in_group_targets_route_chain() {
        let log: Log = Arc::default();
        Router::new().group(|scope| {
            let scope = scope.with(tag("a", log.clone()));
            assert!(scope.is_sub_router);
            assert!(scope.global_chain.is_empty());
            assert_eq!(scope.route_chain.len(), 1);
            scope
        });
    }

    #[tokio::test]
    async fn group_snapshot_ignores_later_parent_additions() {
        let log: Log = Arc::default();
        let router = Router::new()
            .group(|outer| {
                outer
                    .with(tag("A", log.clone()))
                    .group(|inner| {
                        inner
                            .with(tag("B", log.clone()))
                            .handle("/p", endpoint("h", log.clone()))
                    })
                    .with(tag("C", log.clone()))
            });

        router.serve(get("/p")).await;
        assert_eq!(*log.lock().unwrap(), ["A", "B", "h"]);
    }

    #[tokio::test]
    async fn later_with_does_not_rebind_existing_routes() {
        let log: Log = Arc::default();
        let router = Router::new()
            .group(|scope| {
                scope
                    .handle("/early", endpoint("early", log.clone()))
                    .with(tag("late", log.clone()))
                    .handle("/after", endpoint("after", log.clone()))
            });

        router.serve(get("/early")).await;
        router.serve(get("/after")).await;
        assert_eq!(*log.lock().unwrap(), ["early", "late", "after"]);
    }

    #[tokio::test]
    async fn siblings_do_not_see_each_other() {
        let log: Log = Arc::default();
        let router = Router::new()
            .group(|one| {
                one.with(tag("one", log.clone()))
                    .handle("/one", endpoint("h1", log.clone()))
            })
            .group(|two| {
                two.with(tag("two", log.clone()))
                    .handle("/two", endpoint("h2", log.clone()))
            });

        router.serve(get("/two")).await;
        router.serve(get("/one")).await;
        assert_eq!(*log.lock().unwrap(), ["two", "h2", "one", "h1"]);
    }

    #[tokio::test]
    async fn global_chain_wraps_unmatched_requests() {
        let log: Log = Arc::default();
        let app = Router::new()
            .with(tag("g", log.clone()))
            .into_app();

        let res = app.call(get("/missing")).await;
        assert_eq!(res.status_code(), Status::NOT_FOUND);
        assert_eq!(*log.lock().unwrap(), ["g"]);
    }

    #[tokio::test]
    async fn global_added_after_routes_still_applies() {
        let log: Log = Arc::default();
        let app = Router::new()
            .handle("/x", endpoint("h", log.clone()))
            .with(tag("g", log.clone()))
            .into_app();

        app.call(get("/x")).await;
        assert_eq!(*log.lock().unwrap(), ["g", "h"]);
    }

    #[test]
    #[should_panic(expected = "must return the router it was given")]
    fn group_rejects_a_foreign_router() {
        let log: Log = Arc::default();
        let _ = Router::new()
            .handle("/a", endpoint("a", log))
            .group(|_scope| Router::new());
    }

    #[tokio::test]
    async fn nested_groups_hand_the_mux_back() {
        let log: Log = Arc::default();
        let router = Router::new()
            .handle("/a", endpoint("a", log.clone()))
            .group(|outer| outer.group(|inner| inner.handle("/b", endpoint("b", log.clone()))))
            .handle("/c", endpoint("c", log.clone()));

        for path in ["/a", "/b", "/c"] {
            let res = router.serve(get(path)).await;
            assert_eq!(res.status_code(), Status::OK, "{path}");
        }
        assert_eq!(*log.lock().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn try_handle_surfaces_mux_errors() {
        let log: Log = Arc::default();
        let result = Router::new()
            .handle("GET /a", endpoint("a", log.clone()))
            .try_handle("GET /a", endpoint("b", log.clone()));
        assert!(matches!(result, Err(RouteError::Duplicate { .. })));
    }

    #[test]
    #[should_panic(expected = "invalid route `no-slash`")]
    fn handle_panics_on_bad_pattern() {
        let log: Log = Arc::default();
        let _ = Router::new().handle("no-slash", endpoint("x", log));
    }
}
