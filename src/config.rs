//! Run configuration.
//!
//! Resolution order: built-in defaults, the YAML file, `RENDER_SNAPSHOT_*`
//! environment variables, then command-line flags. Durations in YAML are
//! milliseconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};
use url::Url;
use wd_session::config::{headless_from_env, resolve_browser_binary, webdriver_url_from_env};
use wd_session::{detect_driver_executable, driver_from_env, DriverConfig};

use crate::coordinator::DEFAULT_PROBE_TIMEOUT;
use crate::errors::{RenderError, RenderResult};
use crate::gate::OriginMode;
use crate::target::RenderTarget;
use crate::wait::{PollPolicy, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL};

pub const DEFAULT_PORT: u16 = 8084;
pub const LOCAL_CONFIG_PATH: &str = "config/render-snapshot.yaml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub port: u16,
    /// Static root for the local origin.
    pub dir: Option<PathBuf>,
    pub page: String,
    pub selector: String,
    /// Standard output when unset.
    pub outfile: Option<PathBuf>,
    pub external_origin: bool,
    pub probe_timeout_ms: u64,
    pub driver: DriverSettings,
    pub poll: PollSettings,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            dir: None,
            page: String::new(),
            selector: String::new(),
            outfile: None,
            external_origin: false,
            probe_timeout_ms: millis(DEFAULT_PROBE_TIMEOUT),
            driver: DriverSettings::default(),
            poll: PollSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    /// Existing WebDriver endpoint; chromedriver is spawned when unset.
    pub webdriver_url: Option<String>,
    pub chromedriver: Option<PathBuf>,
    pub port: u16,
    pub browser_binary: Option<PathBuf>,
    pub headless: bool,
    pub verbose: bool,
    pub startup_timeout_ms: u64,
}

impl Default for DriverSettings {
    fn default() -> Self {
        let base = DriverConfig::builtin();
        Self {
            webdriver_url: None,
            chromedriver: None,
            port: base.driver_port,
            browser_binary: None,
            headless: base.headless,
            verbose: base.verbose,
            startup_timeout_ms: millis(base.startup_timeout),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_wait_ms: Option<u64>,
    pub max_polls: Option<u64>,
    /// Ignore both bounds and poll until the marker disappears.
    pub unbounded: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: millis(DEFAULT_POLL_INTERVAL),
            max_wait_ms: Some(millis(DEFAULT_MAX_WAIT)),
            max_polls: None,
            unbounded: false,
        }
    }
}

pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl RenderConfig {
    /// Read the YAML file at `explicit`, or the first default location that
    /// exists. Only an explicit path is required to exist.
    pub async fn load(explicit: Option<&Path>) -> RenderResult<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_paths().into_iter().find(|path| path.exists()) {
                Some(path) => path,
                None => {
                    info!("no config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path).await.map_err(|err| {
            RenderError::invalid_config(format!("cannot read {}: {err}", path.display()))
        })?;
        let config = Self::from_yaml(&content).map_err(|err| match err {
            RenderError::InvalidConfig(message) => {
                RenderError::invalid_config(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> RenderResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|err| RenderError::invalid_config(err.to_string()))
    }

    /// Layer the `RENDER_SNAPSHOT_*` driver variables over file values. The
    /// WebDriver URL is kept raw so that [`validate`](Self::validate) rejects
    /// a malformed one.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = webdriver_url_from_env() {
            self.driver.webdriver_url = Some(url);
        }
        if let Some(path) = driver_from_env() {
            self.driver.chromedriver = Some(path);
        }
        if let Some(path) = resolve_browser_binary() {
            self.driver.browser_binary = Some(path);
        }
        if let Some(headless) = headless_from_env() {
            self.driver.headless = headless;
        }
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.port == 0 {
            return Err(RenderError::invalid_config("listen port must be non-zero"));
        }
        if self.selector.trim().is_empty() {
            return Err(RenderError::invalid_config("a readiness selector is required"));
        }
        if !self.external_origin && self.dir.is_none() {
            return Err(RenderError::invalid_config(
                "a static root directory is required unless the origin is external",
            ));
        }
        if self.poll.interval_ms == 0 {
            return Err(RenderError::invalid_config("poll interval must be non-zero"));
        }
        if self.poll.max_polls == Some(0) {
            return Err(RenderError::invalid_config("max polls must be at least 1"));
        }
        if self.driver.port == 0 {
            return Err(RenderError::invalid_config("driver port must be non-zero"));
        }
        if let Some(raw) = &self.driver.webdriver_url {
            parse_webdriver_url(raw)?;
        }
        Ok(())
    }

    pub fn target(&self) -> RenderResult<RenderTarget> {
        RenderTarget::new(self.port, &self.page, &self.selector)
    }

    pub fn origin_mode(&self) -> RenderResult<OriginMode> {
        if self.external_origin {
            if self.dir.is_some() {
                warn!("--dir is ignored for an external origin");
            }
            return Ok(OriginMode::ExternallyManaged);
        }
        let root = self.dir.clone().ok_or_else(|| {
            RenderError::invalid_config(
                "a static root directory is required unless the origin is external",
            )
        })?;
        Ok(OriginMode::LocallyStarted { root })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let interval = Duration::from_millis(self.poll.interval_ms);
        if self.poll.unbounded {
            return PollPolicy::unbounded(interval);
        }
        PollPolicy {
            interval,
            max_wait: self.poll.max_wait_ms.map(Duration::from_millis),
            max_polls: self.poll.max_polls,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn driver_config(&self) -> RenderResult<DriverConfig> {
        let base = DriverConfig::builtin();
        let webdriver_url = self
            .driver
            .webdriver_url
            .as_deref()
            .map(parse_webdriver_url)
            .transpose()?;
        Ok(DriverConfig {
            webdriver_url,
            chromedriver: self
                .driver
                .chromedriver
                .clone()
                .or_else(detect_driver_executable),
            driver_port: self.driver.port,
            browser_binary: self.driver.browser_binary.clone(),
            headless: self.driver.headless,
            verbose: self.driver.verbose,
            startup_timeout: Duration::from_millis(self.driver.startup_timeout_ms),
            window_size: base.window_size,
        })
    }
}

fn parse_webdriver_url(raw: &str) -> RenderResult<Url> {
    Url::parse(raw.trim())
        .map_err(|err| RenderError::invalid_config(format!("webdriver url {raw:?}: {err}")))
}

/// `./config/render-snapshot.yaml`, then the user config directory.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_PATH)];
    if let Some(mut path) = dirs::config_dir() {
        path.push("render-snapshot");
        path.push("config.yaml");
        paths.push(path);
    }
    paths
}
