//! chromedriver child process owned by a session.

use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::config::DriverConfig;
use crate::detect_driver_executable;
use crate::error::SessionError;

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct DriverService {
    child: Child,
    url: Url,
    drains: Vec<JoinHandle<()>>,
}

impl DriverService {
    /// Launch chromedriver on `cfg.driver_port` and wait until `/status`
    /// reports ready.
    pub async fn spawn(cfg: &DriverConfig) -> Result<Self, SessionError> {
        let binary = cfg
            .chromedriver
            .clone()
            .or_else(detect_driver_executable)
            .ok_or_else(|| {
                SessionError::Driver(
                    "chromedriver not found; pass --chromedriver, set RENDER_SNAPSHOT_CHROMEDRIVER, or use --webdriver-url"
                        .to_string(),
                )
            })?;

        let url = Url::parse(&format!("http://127.0.0.1:{}/", cfg.driver_port))
            .map_err(|err| SessionError::Driver(err.to_string()))?;

        let mut command = Command::new(&binary);
        command.arg(format!("--port={}", cfg.driver_port));
        if cfg.verbose {
            command.arg("--verbose");
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| {
            SessionError::Driver(format!("failed to launch {}: {err}", binary.display()))
        })?;
        debug!(binary = %binary.display(), port = cfg.driver_port, "chromedriver launched");

        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(drain_lines(stdout, cfg.verbose));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(drain_lines(stderr, cfg.verbose));
        }

        let mut service = Self { child, url, drains };
        if let Err(err) = service.wait_until_ready(cfg.startup_timeout).await {
            service.shutdown().await;
            return Err(err);
        }
        info!(url = %service.url, "chromedriver ready");
        Ok(service)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .map_err(|err| SessionError::Driver(err.to_string()))?;
        let status_url = self
            .url
            .join("status")
            .map_err(|err| SessionError::Driver(err.to_string()))?;
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(status) = self
                .child
                .try_wait()
                .map_err(|err| SessionError::Driver(err.to_string()))?
            {
                return Err(SessionError::Driver(format!(
                    "chromedriver exited during startup ({status})"
                )));
            }

            match client.get(status_url.clone()).send().await {
                Ok(response) => match response.json::<Value>().await {
                    Ok(body) if driver_reports_ready(&body) => return Ok(()),
                    Ok(_) => trace!("chromedriver status not ready yet"),
                    Err(err) => trace!(?err, "chromedriver status was not json"),
                },
                Err(err) => trace!(?err, "chromedriver status endpoint not reachable yet"),
            }

            if Instant::now() >= deadline {
                return Err(SessionError::Driver(format!(
                    "chromedriver did not become ready within {}ms",
                    timeout.as_millis()
                )));
            }
            sleep(STATUS_POLL_INTERVAL).await;
        }
    }

    pub async fn shutdown(&mut self) {
        if let Err(err) = self.child.kill().await {
            warn!(?err, "failed to stop chromedriver");
        }
        for drain in self.drains.drain(..) {
            drain.abort();
        }
    }
}

impl Drop for DriverService {
    fn drop(&mut self) {
        for drain in &self.drains {
            drain.abort();
        }
    }
}

fn drain_lines<R>(reader: R, verbose: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if verbose {
                info!(target: "chromedriver", "{line}");
            } else {
                trace!(target: "chromedriver", "{line}");
            }
        }
    })
}

/// W3C `GET /status` answers `{"value": {"ready": true, ...}}`.
fn driver_reports_ready(body: &Value) -> bool {
    body.get("value")
        .and_then(|value| value.get("ready"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
