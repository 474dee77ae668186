//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on the root, outside any group, so auth layers never gate
//! the probes:
//!
//! ```rust
//! use strata::{Router, health};
//!
//! let app = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```

use crate::{Request, Response};

/// Liveness probe. Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe (default implementation). `200 OK` with body `"ready"`.
///
/// Replace it with your own handler when the service must warm up or check
/// dependencies before taking traffic.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Router;

    #[tokio::test]
    async fn probes_answer_on_their_paths() {
        let app = Router::new()
            .get("/healthz", liveness)
            .get("/readyz", readiness)
            .into_app();

        let live = app.call(Request::builder().uri("/healthz").build()).await;
        let ready = app.call(Request::builder().uri("/readyz").build()).await;
        assert_eq!(live.body(), b"ok");
        assert_eq!(ready.body(), b"ready");
    }
}
