//! Static file origin for render-snapshot.
//!
//! Serves a directory over HTTP with `tower-http`'s `ServeDir`. The listener
//! is bound on a background task that reports the bind outcome over a one-shot
//! channel, so callers can wait for the origin to be servable before pointing
//! a browser at it. Once bound, the task is detached: later failures are only
//! logged. [`probe`] checks an origin that is managed elsewhere.

pub mod probe;
pub mod server;

pub use error::OriginError;
pub use probe::{probe, ProbeReport};
pub use server::{router, OriginTask, StaticOrigin};

pub mod error {
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use thiserror::Error;
    use url::Url;

    #[derive(Debug, Error)]
    pub enum OriginError {
        #[error("static root {0} is not a directory")]
        MissingRoot(PathBuf),
        #[error("failed to bind static origin on {addr}")]
        Bind {
            addr: SocketAddr,
            #[source]
            source: std::io::Error,
        },
        #[error("static origin task ended before reporting readiness")]
        StartupAborted,
        #[error("origin {url} did not answer")]
        Unreachable {
            url: Url,
            #[source]
            source: reqwest::Error,
        },
        #[error("failed to build probe client")]
        Client(#[source] reqwest::Error),
        #[error("invalid origin url")]
        InvalidUrl(#[from] url::ParseError),
    }

    impl OriginError {
        pub fn code(&self) -> &'static str {
            match self {
                OriginError::MissingRoot(_) => "missing_root",
                OriginError::Bind { .. } => "bind",
                OriginError::StartupAborted => "startup_aborted",
                OriginError::Unreachable { .. } => "unreachable",
                OriginError::Client(_) => "client",
                OriginError::InvalidUrl(_) => "invalid_url",
            }
        }
    }
}
