//! Per-request tracing.
//!
//! Opens an `http.request` span carrying the method and path, and logs the
//! status and latency once the inner handler has responded. Register it first
//! on the root router so the span covers every other layer.

use std::time::Instant;

use tracing::{info, info_span, Instrument};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Middleware;
use crate::request::Request;

/// Tracing middleware. See [`trace`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

/// Returns the tracing middleware.
pub fn trace() -> Trace {
    Trace
}

impl Middleware for Trace {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxedHandler::erase(TraceHandler { next })
    }
}

struct TraceHandler {
    next: BoxedHandler,
}

impl ErasedHandler for TraceHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let span = info_span!(
            "http.request",
            method = %req.method(),
            path = req.path(),
        );
        let fut = self.next.call(req);
        Box::pin(
            async move {
                let started = Instant::now();
                let res = fut.await;
                info!(
                    status = res.status_code().as_u16(),
                    latency_us = started.elapsed().as_micros() as u64,
                    "request completed"
                );
                res
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;

    #[tokio::test]
    async fn passes_response_through_untouched() {
        let inner = BoxedHandler::new(|_req: Request| async { Status::CREATED });
        let handler = trace().wrap(inner);
        let res = handler.call(Request::builder().uri("/x").build()).await;
        assert_eq!(res.status_code(), Status::CREATED);
    }
}
