//! Pattern multiplexer.
//!
//! A single radix tree (via [`matchit`]) maps paths to endpoint slots; each
//! slot holds per-method handlers plus an optional method-less one. The mux
//! is itself a handler: the router composes the global chain around it.
//!
//! # Patterns
//!
//! `"[METHOD ]PATH"`:
//!
//! | Pattern | Matches |
//! |---|---|
//! | `/health` | any method, exactly `/health` |
//! | `GET /users/{id}` | `GET` (and `HEAD`) on `/users/42`, `id = "42"` |
//! | `/files/{*path}` | `/files/a/b.txt`, `path = "a/b.txt"` |
//! | `/static/` | `/static/` and everything below it |
//! | `/{$}` | exactly `/`, nothing below it |
//!
//! `/docs/{$}` and `/docs/` may both be registered: the first answers for
//! `/docs/` itself, the second for everything below it and for any method
//! the first does not handle.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;
use crate::Status;

/// Catch-all parameter used to implement trailing-slash subtree patterns.
/// Stripped from the parameters handed to handlers.
const SUBTREE_PARAM: &str = "__subtree";

/// Errors raised while registering a pattern.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    #[error("invalid method in pattern `{pattern}`")]
    InvalidMethod { pattern: String },

    #[error("pattern `{pattern}` conflicts with an existing route: {source}")]
    Conflict {
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("pattern `{pattern}` is already registered")]
    Duplicate { pattern: String },
}

/// Pattern → handler table.
///
/// Build it through [`Router`](crate::Router), or standalone with
/// [`Mux::handle`] when no middleware is needed.
#[derive(Clone, Default)]
pub struct Mux {
    tree: MatchitRouter<usize>,
    slots: HashMap<String, usize>,
    endpoints: Vec<Endpoint>,
}

/// Handlers registered on one tree path.
///
/// A trailing-slash pattern and its `{$}` twin share the tree path `/a/`, so
/// the endpoint keeps them apart: `exact` handlers answer first, `subtree`
/// handlers take whatever they leave.
#[derive(Clone, Default)]
struct Endpoint {
    exact: Handlers,
    subtree: Handlers,
}

#[derive(Clone, Default)]
struct Handlers {
    any: Option<BoxedHandler>,
    methods: HashMap<Method, BoxedHandler>,
}

impl Handlers {
    fn is_taken(&self, method: Option<&Method>) -> bool {
        match method {
            Some(m) => self.methods.contains_key(m),
            None => self.any.is_some(),
        }
    }

    fn insert(&mut self, method: Option<&Method>, handler: BoxedHandler) {
        match method {
            Some(m) => {
                self.methods.insert(m.clone(), handler);
            }
            None => self.any = Some(handler),
        }
    }

    fn select(&self, method: &Method) -> Option<&BoxedHandler> {
        self.methods.get(method)
            .or_else(|| {
                if *method == Method::HEAD { self.methods.get(&Method::GET) } else { None }
            })
            .or(self.any.as_ref())
    }
}

impl Endpoint {
    fn handlers(&self, reach: Reach) -> &Handlers {
        match reach {
            Reach::Exact => &self.exact,
            Reach::Subtree => &self.subtree,
        }
    }

    fn handlers_mut(&mut self, reach: Reach) -> &mut Handlers {
        match reach {
            Reach::Exact => &mut self.exact,
            Reach::Subtree => &mut self.subtree,
        }
    }

    fn select(&self, method: &Method) -> Option<&BoxedHandler> {
        self.exact.select(method).or_else(|| self.subtree.select(method))
    }

    /// Value for the `allow` header on a 405.
    fn allowed(&self) -> String {
        let mut names: Vec<&str> = self.exact.methods.keys()
            .chain(self.subtree.methods.keys())
            .map(Method::as_str)
            .collect();
        if names.contains(&Method::GET.as_str()) {
            names.push(Method::HEAD.as_str());
        }
        names.sort_unstable();
        names.dedup();
        names.join(", ")
    }
}

/// Which handler set of an [`Endpoint`] a tree route feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reach {
    Exact,
    Subtree,
}

/// A parsed `"[METHOD ]PATH"` pattern.
struct Pattern {
    method: Option<Method>,
    /// Tree paths to register: the exact path, plus a catch-all for subtrees.
    routes: Vec<(String, Reach)>,
}

impl Pattern {
    fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason| RouteError::InvalidPattern { pattern: pattern.to_owned(), reason };

        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty pattern"));
        }

        let (method, path) = match trimmed.split_once(char::is_whitespace) {
            Some((method, path)) => {
                let method = Method::from_bytes(method.as_bytes())
                    .map_err(|_| RouteError::InvalidMethod { pattern: pattern.to_owned() })?;
                (Some(method), path.trim_start())
            }
            None => (None, trimmed),
        };

        if !path.starts_with('/') {
            return Err(invalid("path must start with `/`"));
        }
        if path.contains(char::is_whitespace) {
            return Err(invalid("path must not contain whitespace"));
        }

        let routes = if let Some(exact) = path.strip_suffix("{$}") {
            if !exact.ends_with('/') {
                return Err(invalid("`{$}` must follow a `/`"));
            }
            vec![(exact.to_owned(), Reach::Exact)]
        } else if path.ends_with('/') {
            vec![
                (path.to_owned(), Reach::Subtree),
                (format!("{path}{{*{SUBTREE_PARAM}}}"), Reach::Subtree),
            ]
        } else {
            vec![(path.to_owned(), Reach::Exact)]
        };

        Ok(Self { method, routes })
    }
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `pattern`.
    ///
    /// # Panics
    ///
    /// Panics on a malformed, conflicting or duplicate pattern. Use
    /// [`try_handle`](Mux::try_handle) to get the error instead.
    pub fn handle(&mut self, pattern: &str, handler: BoxedHandler) {
        if let Err(e) = self.try_handle(pattern, handler) {
            panic!("invalid route `{pattern}`: {e}");
        }
    }

    /// Registers `handler` under `pattern`, or leaves the mux untouched and
    /// returns why it could not.
    pub fn try_handle(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), RouteError> {
        let parsed = Pattern::parse(pattern)?;
        let method = parsed.method.as_ref();

        let taken = parsed.routes.iter().any(|(route, reach)| {
            self.slots.get(route)
                .is_some_and(|&slot| self.endpoints[slot].handlers(*reach).is_taken(method))
        });
        if taken {
            return Err(RouteError::Duplicate { pattern: pattern.to_owned() });
        }

        // A subtree pattern adds two tree routes. Insert into a copy so a
        // conflict on the second leaves the first unregistered too.
        let fresh: Vec<&str> = parsed.routes.iter()
            .map(|(route, _)| route.as_str())
            .filter(|route| !self.slots.contains_key(*route))
            .collect();
        if !fresh.is_empty() {
            let mut tree = self.tree.clone();
            for (i, route) in fresh.iter().enumerate() {
                tree.insert(*route, self.endpoints.len() + i).map_err(|source| {
                    RouteError::Conflict { pattern: pattern.to_owned(), source }
                })?;
            }
            self.tree = tree;
            for route in fresh {
                self.slots.insert(route.to_owned(), self.endpoints.len());
                self.endpoints.push(Endpoint::default());
            }
        }

        for (route, reach) in &parsed.routes {
            let slot = self.slots[route];
            self.endpoints[slot].handlers_mut(*reach).insert(method, handler.clone());
        }
        Ok(())
    }

    /// Number of distinct tree paths registered.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Erases the mux into a handler, sharing it without copying the table.
    pub fn into_handler(self: Arc<Self>) -> BoxedHandler {
        BoxedHandler::from_arc(self)
    }
}

impl ErasedHandler for Mux {
    fn call(&self, mut req: Request) -> BoxFuture {
        let Ok(matched) = self.tree.at(req.path()) else {
            return Box::pin(std::future::ready(Response::status(Status::NOT_FOUND)));
        };

        let endpoint = &self.endpoints[*matched.value];
        let Some(handler) = endpoint.select(req.method()) else {
            let res = Response::builder()
                .status(Status::METHOD_NOT_ALLOWED)
                .header("allow", &endpoint.allowed())
                .no_body();
            return Box::pin(std::future::ready(res));
        };

        let params = matched.params.iter()
            .filter(|(k, _)| *k != SUBTREE_PARAM)
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        let handler = handler.clone();
        req.set_params(params);
        handler.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(body: &'static str) -> BoxedHandler {
        BoxedHandler::new(move |_req: Request| async move { body })
    }

    fn echo_param(name: &'static str) -> BoxedHandler {
        BoxedHandler::new(move |req: Request| async move {
            req.param(name).unwrap_or("-").to_owned()
        })
    }

    async fn send(mux: &Mux, method: Method, path: &str) -> Response {
        mux.call(Request::builder().method(method).uri(path).build()).await
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let mut mux = Mux::new();
        mux.handle("/a", reply("a"));
        let res = send(&mux, Method::GET, "/b").await;
        assert_eq!(res.status_code(), Status::NOT_FOUND);
    }

    #[tokio::test]
    async fn method_mismatch_is_405_with_allow() {
        let mut mux = Mux::new();
        mux.handle("GET /items", reply("list"));
        mux.handle("POST /items", reply("create"));
        let res = send(&mux, Method::DELETE, "/items").await;
        assert_eq!(res.status_code(), Status::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET, HEAD, POST"));
    }

    #[tokio::test]
    async fn method_specific_wins_over_method_less() {
        let mut mux = Mux::new();
        mux.handle("/items", reply("any"));
        mux.handle("POST /items", reply("post"));
        assert_eq!(send(&mux, Method::POST, "/items").await.body(), b"post");
        assert_eq!(send(&mux, Method::PUT, "/items").await.body(), b"any");
    }

    #[tokio::test]
    async fn head_falls_back_to_get() {
        let mut mux = Mux::new();
        mux.handle("GET /page", reply("page"));
        let res = send(&mux, Method::HEAD, "/page").await;
        assert_eq!(res.status_code(), Status::OK);
    }

    #[tokio::test]
    async fn params_reach_the_handler() {
        let mut mux = Mux::new();
        mux.handle("GET /users/{id}", echo_param("id"));
        mux.handle("/files/{*path}", echo_param("path"));
        assert_eq!(send(&mux, Method::GET, "/users/42").await.body(), b"42");
        assert_eq!(send(&mux, Method::GET, "/files/a/b.txt").await.body(), b"a/b.txt");
    }

    #[tokio::test]
    async fn trailing_slash_matches_subtree() {
        let mut mux = Mux::new();
        mux.handle("/static/", echo_param(SUBTREE_PARAM));
        assert_eq!(send(&mux, Method::GET, "/static/").await.status_code(), Status::OK);
        let nested = send(&mux, Method::GET, "/static/css/site.css").await;
        assert_eq!(nested.status_code(), Status::OK);
        assert_eq!(nested.body(), b"-");
    }

    #[tokio::test]
    async fn exact_marker_excludes_subtree() {
        let mut mux = Mux::new();
        mux.handle("/{$}", reply("root"));
        assert_eq!(send(&mux, Method::GET, "/").await.body(), b"root");
        assert_eq!(send(&mux, Method::GET, "/other").await.status_code(), Status::NOT_FOUND);
    }

    #[tokio::test]
    async fn exact_and_subtree_share_a_path() {
        let mut mux = Mux::new();
        mux.try_handle("/{$}", reply("home")).unwrap();
        mux.try_handle("/", reply("fallback")).unwrap();
        assert_eq!(send(&mux, Method::GET, "/").await.body(), b"home");
        assert_eq!(send(&mux, Method::GET, "/anything/else").await.body(), b"fallback");

        let err = mux.try_handle("/{$}", reply("again")).unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn exact_method_miss_falls_through_to_subtree() {
        let mut mux = Mux::new();
        mux.handle("GET /docs/{$}", reply("index"));
        mux.handle("/docs/", reply("tree"));
        assert_eq!(send(&mux, Method::GET, "/docs/").await.body(), b"index");
        assert_eq!(send(&mux, Method::POST, "/docs/").await.body(), b"tree");
    }

    #[tokio::test]
    async fn allow_lists_methods_from_both_reaches() {
        let mut mux = Mux::new();
        mux.handle("PUT /docs/{$}", reply("put"));
        mux.handle("GET /docs/", reply("get"));
        let res = send(&mux, Method::DELETE, "/docs/").await;
        assert_eq!(res.status_code(), Status::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET, HEAD, PUT"));
    }

    #[tokio::test]
    async fn failed_subtree_registration_changes_nothing() {
        let mut mux = Mux::new();
        mux.handle("/a/{id}", echo_param("id"));
        assert_eq!(mux.len(), 1);

        let err = mux.try_handle("/a/", reply("sub")).unwrap_err();
        assert!(matches!(err, RouteError::Conflict { .. }));
        assert_eq!(mux.len(), 1);
        assert_ne!(send(&mux, Method::GET, "/a/").await.body(), b"sub");
        assert_eq!(send(&mux, Method::GET, "/a/7").await.body(), b"7");

        // The slot the failed call would have used is still free.
        mux.try_handle("/b/", reply("b")).unwrap();
        assert_eq!(send(&mux, Method::GET, "/b/x").await.body(), b"b");
    }

    #[test]
    fn duplicate_pattern_is_rejected() {
        let mut mux = Mux::new();
        mux.try_handle("GET /a", reply("1")).unwrap();
        mux.try_handle("POST /a", reply("2")).unwrap();
        let err = mux.try_handle("GET /a", reply("3")).unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));
        assert_eq!(mux.len(), 1);
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        let mut mux = Mux::new();
        assert!(matches!(
            mux.try_handle("", reply("x")),
            Err(RouteError::InvalidPattern { .. })
        ));
        assert!(matches!(
            mux.try_handle("users", reply("x")),
            Err(RouteError::InvalidPattern { .. })
        ));
        assert!(matches!(
            mux.try_handle("G(T /x", reply("x")),
            Err(RouteError::InvalidMethod { .. })
        ));
    }

    #[test]
    fn conflicting_params_are_rejected() {
        let mut mux = Mux::new();
        mux.try_handle("/users/{id}", reply("x")).unwrap();
        let err = mux.try_handle("/users/{name}", reply("y")).unwrap_err();
        assert!(matches!(err, RouteError::Conflict { .. }));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn handle_panics_on_error() {
        let mut mux = Mux::new();
        mux.handle("nope", reply("x"));
    }
}
