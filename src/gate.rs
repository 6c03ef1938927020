//! Origin readiness gate: the browser is never pointed at the target before
//! the content origin can serve it.

use std::path::PathBuf;
use std::time::Duration;

use static_origin::{probe, OriginTask, StaticOrigin};
use tracing::info;
use url::Url;

use crate::errors::{RenderError, RenderResult};
use crate::target::RenderTarget;

/// Where the page content comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OriginMode {
    /// Something else already serves the target; probe it once.
    ExternallyManaged,
    /// Serve `root` from this process for the rest of its lifetime.
    LocallyStarted { root: PathBuf },
}

/// The origin that is active for this run.
#[derive(Debug)]
pub enum OriginHandle {
    ExternallyManaged { url: Url, status: u16 },
    LocallyStarted(OriginTask),
}

impl OriginHandle {
    pub fn is_external(&self) -> bool {
        matches!(self, OriginHandle::ExternallyManaged { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            OriginHandle::ExternallyManaged { .. } => "external",
            OriginHandle::LocallyStarted(_) => "local",
        }
    }
}

pub async fn ensure_origin(
    target: &RenderTarget,
    mode: &OriginMode,
    probe_timeout: Duration,
) -> RenderResult<OriginHandle> {
    match mode {
        OriginMode::ExternallyManaged => {
            info!("skipping local server");
            let url = target.navigation_url().clone();
            let report = probe(&url, probe_timeout).await.map_err(|source| {
                RenderError::OriginUnreachable {
                    url: url.clone(),
                    source,
                }
            })?;
            Ok(OriginHandle::ExternallyManaged {
                url,
                status: report.status,
            })
        }
        OriginMode::LocallyStarted { root } => {
            let task = StaticOrigin::on_port(root.clone(), target.port())
                .spawn()
                .await
                .map_err(RenderError::OriginStartError)?;
            Ok(OriginHandle::LocallyStarted(task))
        }
    }
}
