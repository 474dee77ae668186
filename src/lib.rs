//! # strata
//!
//! Ordered, scoped middleware on top of a pattern-matching HTTP multiplexer.
//!
//! ## The contract
//!
//! - **Global middleware** — added with [`Router::with`] on the root. Wraps the
//!   whole multiplexer, so it runs on every request, including 404s, before
//!   anything route-specific.
//! - **Route middleware** — added with `with` inside [`Router::group`]. Bound
//!   to each handler the moment the handler is registered, and visible only
//!   to that group and the groups nested in it.
//! - **Order** — the first layer added is the outermost: it runs first on the
//!   way in and last on the way out.
//!
//! Setup is a chain of builder calls. [`Router::into_app`] freezes the result
//! into an immutable [`App`] shared by every request without locks.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strata::middleware::{self, Next};
//! use strata::{Request, Response, Router, Server, Status};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .with(middleware::trace())
//!         .get("/healthz", strata::health::liveness)
//!         .group(|admin| {
//!             admin
//!                 .with(middleware::from_fn(require_token))
//!                 .get("/admin/users/{id}", get_user)
//!         });
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn require_token(req: Request, next: Next) -> Response {
//!     if req.header("authorization").is_none() {
//!         return Response::status(Status::UNAUTHORIZED);
//!     }
//!     next.run(req).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//! ```

mod chain;
mod error;
mod handler;
mod mux;
mod request;
mod response;
mod router;
mod server;

pub mod env;
pub mod health;
pub mod middleware;
pub mod validator;

pub use chain::Chain;
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use http::Method;
pub use http::StatusCode as Status;
pub use middleware::Middleware;
pub use mux::{Mux, RouteError};
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{App, Router};
pub use server::Server;
