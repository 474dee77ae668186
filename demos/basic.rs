//! Minimal strata example — global tracing, a public API, and an admin group
//! behind a bearer token.
//!
//! Run with:
//!   RUST_LOG=info PORT=3000 cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d 'name=alice&email=alice@example.com'
//!   curl http://localhost:3000/admin/stats                          # 401
//!   curl -H 'authorization: Bearer letmein' http://localhost:3000/admin/stats
//!   curl http://localhost:3000/healthz

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use strata::middleware::{self, Next};
use strata::validator::{self, Validator};
use strata::{env, health, BoxedHandler, IntoResponse, Request, Response, Router, Server, Status};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let token = env::get_string("ADMIN_TOKEN", "letmein");
    let hits = Arc::new(AtomicU64::new(0));

    let app = Router::new()
        .with(middleware::trace())
        .with(count_requests(Arc::clone(&hits)))
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness)
        .get("/users/{id}", get_user)
        .post("/users", create_user)
        .group(|admin| {
            admin
                .with(middleware::from_fn(move |req: Request, next: Next| {
                    let expected = format!("Bearer {token}");
                    async move {
                        let authorized = req
                            .header("authorization")
                            .is_some_and(|got| validator::is_equal(got, &expected));
                        if !authorized {
                            return Response::status(Status::UNAUTHORIZED);
                        }
                        next.run(req).await
                    }
                }))
                .get("/admin/stats", move |_req: Request| {
                    let hits = Arc::clone(&hits);
                    async move { format!("requests served: {}", hits.load(Ordering::Relaxed)) }
                })
        });

    let server = Server::from_env().expect("invalid HOST/PORT");
    server.serve(app).await.expect("server error");
}

/// Counts every request, matched or not.
fn count_requests(hits: Arc<AtomicU64>) -> impl Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static {
    move |next: BoxedHandler| {
        let hits = Arc::clone(&hits);
        BoxedHandler::new(move |req: Request| {
            hits.fetch_add(1, Ordering::Relaxed);
            next.call(req)
        })
    }
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users with a form body: name=...&email=...
async fn create_user(req: Request) -> Response {
    let body = String::from_utf8_lossy(req.body());
    let field = |key: &str| {
        body.split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_owned())
            .unwrap_or_default()
    };
    let (name, email) = (field("name"), field("email"));

    let mut v = Validator::new();
    v.check_field(validator::not_blank(&name), "name", "must be provided");
    v.check_field(validator::max_chars(&name, 64), "name", "must be at most 64 characters");
    v.check_field(validator::is_email(&email), "email", "must be a valid email address");
    if v.has_errors() {
        return v.into_response();
    }

    Response::builder()
        .status(Status::CREATED)
        .header("location", "/users/99")
        .json(format!(r#"{{"id":"99","name":"{name}"}}"#).into_bytes())
}
