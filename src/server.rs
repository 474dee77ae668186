//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::env;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::{App, Router};
use crate::Status;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string. Use
    /// [`try_bind`](Server::try_bind) to handle the error.
    ///
    /// ```rust,no_run
    /// use strata::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self::try_bind(addr).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|source| Error::Addr { addr: addr.to_owned(), source })?;
        Ok(Self { addr })
    }

    /// Reads `HOST` (default `0.0.0.0`) and `PORT` (default `3000`).
    ///
    /// `HOST` is a bare IP address, v4 or v6 (`::`, not `[::]`).
    pub fn from_env() -> Result<Self, Error> {
        let host = env::try_get_string("HOST", "0.0.0.0")?;
        let port = env::try_get_int("PORT", 3000)?;
        Self::from_parts(&host, port)
    }

    fn from_parts(host: &str, port: i64) -> Result<Self, Error> {
        let ip: IpAddr = host.parse().map_err(|source| Error::Addr { addr: host.to_owned(), source })?;
        let port = u16::try_from(port).map_err(|_| Error::Port { port })?;
        Ok(Self { addr: SocketAddr::new(ip, port) })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Finishes `router` and starts accepting connections.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "strata listening");
        self.run(listener, router.into_app()).await
    }

    async fn run(self, listener: TcpListener, app: App) -> Result<(), Error> {
        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM immediately stops
                // accepting new connections, even if more are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = app.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| dispatch(app.clone(), req, remote_addr));

                        // HTTP/1.1 or HTTP/2, whatever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("strata stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers one request and runs it through the app. Never fails: a body that
/// cannot be read becomes a `400`.
async fn dispatch(
    app: App,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let response = match Request::from_hyper(req, remote_addr).await {
        Ok(req) => app.call(req).await,
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            Response::status(Status::BAD_REQUEST)
        }
    };
    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives: SIGTERM or
/// SIGINT on Unix, Ctrl-C elsewhere. A signal handler that cannot be
/// installed disables that arm.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
