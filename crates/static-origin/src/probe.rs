use std::time::{Duration, Instant};

use tracing::{info, warn};
use url::Url;

use crate::error::OriginError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: u16,
    pub elapsed: Duration,
}

impl ProbeReport {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single GET against `url`.
///
/// Only a transport failure counts as unreachable; any HTTP answer, including
/// an error status, means something is listening.
pub async fn probe(url: &Url, timeout: Duration) -> Result<ProbeReport, OriginError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(OriginError::Client)?;

    let start = Instant::now();
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| OriginError::Unreachable {
            url: url.clone(),
            source,
        })?;

    let report = ProbeReport {
        status: response.status().as_u16(),
        elapsed: start.elapsed(),
    };
    if report.is_success() {
        info!(%url, status = report.status, "origin reachable");
    } else {
        warn!(%url, status = report.status, "origin answered probe with a non-success status");
    }
    Ok(report)
}
