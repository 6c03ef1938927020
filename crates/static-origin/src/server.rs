use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use url::Url;

use crate::error::OriginError;

/// Router serving every path from `root`; directories fall back to their
/// `index.html`.
pub fn router(root: &Path) -> Router {
    let files = ServeDir::new(root).append_index_html_on_directories(true);
    Router::new()
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
}

#[derive(Clone, Debug)]
pub struct StaticOrigin {
    root: PathBuf,
    addr: SocketAddr,
}

impl StaticOrigin {
    pub fn new(root: impl Into<PathBuf>, addr: SocketAddr) -> Self {
        Self {
            root: root.into(),
            addr,
        }
    }

    /// Origin listening on `port` on every IPv4 interface.
    pub fn on_port(root: impl Into<PathBuf>, port: u16) -> Self {
        Self::new(root, SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start serving on a background task and return once the listener is
    /// bound.
    pub async fn spawn(self) -> Result<OriginTask, OriginError> {
        if !self.root.is_dir() {
            return Err(OriginError::MissingRoot(self.root));
        }

        let (ready_tx, ready_rx) = oneshot::channel::<Result<SocketAddr, OriginError>>();
        let app = router(&self.root);
        let addr = self.addr;
        let root = self.root.clone();

        let handle = tokio::spawn(async move {
            let listener = match TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(source) => {
                    let _ = ready_tx.send(Err(OriginError::Bind { addr, source }));
                    return;
                }
            };
            let local_addr = match listener.local_addr() {
                Ok(local_addr) => local_addr,
                Err(source) => {
                    let _ = ready_tx.send(Err(OriginError::Bind { addr, source }));
                    return;
                }
            };
            if ready_tx.send(Ok(local_addr)).is_err() {
                debug!("origin readiness receiver dropped");
            }

            if let Err(err) = axum::serve(listener, app).await {
                error!(?err, addr = %local_addr, "static origin exited");
            }
        });

        match ready_rx.await {
            Ok(Ok(local_addr)) => {
                let base_url = Url::parse(&format!("http://localhost:{}/", local_addr.port()))?;
                info!(
                    "Serving {} on http://localhost:{}",
                    root.display(),
                    local_addr.port()
                );
                Ok(OriginTask {
                    local_addr,
                    base_url,
                    root,
                    handle,
                })
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(OriginError::StartupAborted),
        }
    }
}

/// A bound origin. Dropping it leaves the server running for the rest of
/// the process.
#[derive(Debug)]
pub struct OriginTask {
    local_addr: SocketAddr,
    base_url: Url,
    root: PathBuf,
    handle: JoinHandle<()>,
}

impl OriginTask {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `http://localhost:<port>/` for the bound port.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}
