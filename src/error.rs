//! Unified error type.

use crate::env::EnvError;

/// The error type returned by the server's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: a bad bind address, a bad environment, binding to
/// a port or accepting a connection. Route registration has its own
/// [`RouteError`](crate::RouteError).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("port {port} is out of range")]
    Port { port: i64 },

    #[error(transparent)]
    Env(#[from] EnvError),
}
