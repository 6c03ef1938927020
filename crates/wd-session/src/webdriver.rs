//! `fantoccini`-backed [`BrowserSession`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::error::SessionError;
use crate::ids::ElementId;
use crate::metrics::{SessionMetrics, SessionMetricsSnapshot};
use crate::registry::ElementRegistry;
use crate::service::DriverService;
use crate::session::{BrowserSession, ElementQuery, SessionConnector};

const BASE_CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-notifications",
    "--disable-background-networking",
    "--mute-audio",
];

pub struct WebDriverSession {
    client: Client,
    elements: ElementRegistry<Element>,
    service: Mutex<Option<DriverService>>,
    metrics: SessionMetrics,
    closed: AtomicBool,
}

impl WebDriverSession {
    /// Attach to `cfg.webdriver_url`, or spawn a chromedriver and attach to it.
    pub async fn connect(cfg: &DriverConfig) -> Result<Self, SessionError> {
        let (endpoint, mut service) = match &cfg.webdriver_url {
            Some(url) => {
                info!(%url, "using external webdriver endpoint");
                (url.clone(), None)
            }
            None => {
                let service = DriverService::spawn(cfg).await?;
                (service.url().clone(), Some(service))
            }
        };

        let client = match ClientBuilder::native()
            .capabilities(chrome_capabilities(cfg))
            .connect(endpoint.as_str())
            .await
        {
            Ok(client) => client,
            Err(err) => {
                if let Some(service) = service.as_mut() {
                    service.shutdown().await;
                }
                return Err(SessionError::Start(err.to_string()));
            }
        };
        info!(
            endpoint = %endpoint,
            headless = cfg.headless,
            "webdriver session opened"
        );

        Ok(Self {
            client,
            elements: ElementRegistry::new(),
            service: Mutex::new(service),
            metrics: SessionMetrics::default(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn metrics(&self) -> SessionMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    async fn timed<T, F>(&self, command: F) -> Result<T, CmdError>
    where
        F: Future<Output = Result<T, CmdError>>,
    {
        let start = Instant::now();
        let result = command.await;
        self.metrics.record(start.elapsed(), result.is_ok());
        result
    }

    async fn find_all(&self, query: &ElementQuery) -> Result<Vec<Element>, SessionError> {
        self.ensure_open()?;
        // find-elements answers an absent match with an empty list, which
        // keeps "gone" distinct from a driver-side "no such element" error
        self.timed(self.client.find_all(Locator::Css(query.as_css())))
            .await
            .map_err(map_cmd_error)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        // handles from the previous document are dead after navigation
        self.elements.clear();
        self.timed(self.client.goto(url)).await.map_err(map_cmd_error)?;
        debug!(url, "navigation returned");
        Ok(())
    }

    async fn query(&self, query: &ElementQuery) -> Result<Option<ElementId>, SessionError> {
        let mut found = self.find_all(query).await?;
        if found.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.elements.register(query, found.swap_remove(0))))
    }

    async fn count_matches(&self, query: &ElementQuery) -> Result<usize, SessionError> {
        Ok(self.find_all(query).await?.len())
    }

    async fn property(
        &self,
        element: ElementId,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        self.ensure_open()?;
        let handle = self
            .elements
            .get(&element)
            .ok_or(SessionError::UnknownElement(element))?;
        self.timed(handle.prop(name)).await.map_err(map_cmd_error)
    }

    async fn close(&self) -> Result<(), SessionError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.elements.clear();
        let result = self
            .client
            .clone()
            .close()
            .await
            .map_err(|err| SessionError::Transport(err.to_string()));
        if let Some(mut service) = self.service.lock().await.take() {
            service.shutdown().await;
        }
        let snapshot = self.metrics.snapshot();
        info!(
            commands = snapshot.commands,
            failures = snapshot.command_failures,
            average_latency = ?snapshot.average_latency(),
            "webdriver session closed"
        );
        result
    }
}

/// Builds [`WebDriverSession`]s from a fixed driver configuration.
#[derive(Clone, Debug)]
pub struct WebDriverConnector {
    cfg: DriverConfig,
}

impl WebDriverConnector {
    pub fn new(cfg: DriverConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.cfg
    }
}

#[async_trait]
impl SessionConnector for WebDriverConnector {
    type Session = WebDriverSession;

    async fn connect(&self) -> Result<Self::Session, SessionError> {
        WebDriverSession::connect(&self.cfg).await
    }
}

pub fn map_cmd_error(err: CmdError) -> SessionError {
    let message = err.to_string();
    if err.is_no_such_element() || message.contains("no such element") {
        return SessionError::NoSuchElement(message);
    }
    match err {
        CmdError::Standard(_) => SessionError::Command(message),
        _ => {
            warn!(error = %message, "webdriver transport error");
            SessionError::Transport(message)
        }
    }
}

/// `goog:chromeOptions` capabilities for the configured display mode.
pub fn chrome_capabilities(cfg: &DriverConfig) -> Map<String, Value> {
    let mut args: Vec<String> = BASE_CHROME_ARGS.iter().map(|arg| arg.to_string()).collect();
    let (width, height) = cfg.window_size;
    args.push(format!("--window-size={width},{height}"));
    if cfg.headless {
        args.push("--headless=new".to_string());
    }

    let mut chrome_opts = Map::new();
    chrome_opts.insert("args".to_string(), json!(args));
    if let Some(binary) = &cfg.browser_binary {
        chrome_opts.insert(
            "binary".to_string(),
            Value::String(binary.to_string_lossy().into_owned()),
        );
    }

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), Value::Object(chrome_opts));
    if cfg.verbose {
        caps.insert(
            "goog:loggingPrefs".to_string(),
            json!({ "browser": "ALL", "driver": "ALL" }),
        );
    }
    caps
}
